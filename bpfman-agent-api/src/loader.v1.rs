#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BytecodeImage {
    #[prost(string, tag = "1")]
    pub url: ::prost::alloc::string::String,
    #[prost(int32, tag = "2")]
    pub image_pull_policy: i32,
    #[prost(string, optional, tag = "3")]
    pub username: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "4")]
    pub password: ::core::option::Option<::prost::alloc::string::String>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LoadRequestCommon {
    #[prost(string, tag = "1")]
    pub program_name: ::prost::alloc::string::String,
    #[prost(uint32, tag = "2")]
    pub program_type: u32,
    #[prost(map = "string, bytes", tag = "3")]
    pub global_data: ::std::collections::HashMap<
        ::prost::alloc::string::String,
        ::prost::alloc::vec::Vec<u8>,
    >,
    #[prost(map = "string, string", tag = "4")]
    pub metadata: ::std::collections::HashMap<
        ::prost::alloc::string::String,
        ::prost::alloc::string::String,
    >,
    #[prost(uint32, optional, tag = "5")]
    pub map_owner_id: ::core::option::Option<u32>,
    #[prost(oneof = "load_request_common::Location", tags = "6, 7")]
    pub location: ::core::option::Option<load_request_common::Location>,
}
/// Nested message and enum types in `LoadRequestCommon`.
pub mod load_request_common {
    #[allow(clippy::derive_partial_eq_without_eq)]
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Location {
        #[prost(message, tag = "6")]
        Image(super::BytecodeImage),
        #[prost(string, tag = "7")]
        File(::prost::alloc::string::String),
    }
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct XdpAttachInfo {
    #[prost(string, tag = "1")]
    pub iface: ::prost::alloc::string::String,
    #[prost(int32, tag = "2")]
    pub priority: i32,
    #[prost(int32, repeated, tag = "3")]
    pub proceed_on: ::prost::alloc::vec::Vec<i32>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TcAttachInfo {
    #[prost(string, tag = "1")]
    pub iface: ::prost::alloc::string::String,
    #[prost(int32, tag = "2")]
    pub priority: i32,
    #[prost(string, tag = "3")]
    pub direction: ::prost::alloc::string::String,
    #[prost(int32, repeated, tag = "4")]
    pub proceed_on: ::prost::alloc::vec::Vec<i32>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TracepointAttachInfo {
    #[prost(string, tag = "1")]
    pub tracepoint: ::prost::alloc::string::String,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KprobeAttachInfo {
    #[prost(string, tag = "1")]
    pub fn_name: ::prost::alloc::string::String,
    #[prost(uint64, tag = "2")]
    pub offset: u64,
    #[prost(bool, tag = "3")]
    pub retprobe: bool,
    #[prost(string, optional, tag = "4")]
    pub namespace: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(int64, optional, tag = "5")]
    pub container_pid: ::core::option::Option<i64>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UprobeAttachInfo {
    #[prost(string, tag = "1")]
    pub fn_name: ::prost::alloc::string::String,
    #[prost(uint64, tag = "2")]
    pub offset: u64,
    #[prost(string, tag = "3")]
    pub target: ::prost::alloc::string::String,
    #[prost(bool, tag = "4")]
    pub retprobe: bool,
    #[prost(string, optional, tag = "5")]
    pub namespace: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(int64, optional, tag = "6")]
    pub container_pid: ::core::option::Option<i64>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FentryAttachInfo {
    #[prost(string, tag = "1")]
    pub fn_name: ::prost::alloc::string::String,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FexitAttachInfo {
    #[prost(string, tag = "1")]
    pub fn_name: ::prost::alloc::string::String,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LoadRequest {
    #[prost(message, optional, tag = "1")]
    pub common: ::core::option::Option<LoadRequestCommon>,
    #[prost(oneof = "load_request::AttachInfo", tags = "2, 3, 4, 5, 6, 7, 8")]
    pub attach_info: ::core::option::Option<load_request::AttachInfo>,
}
/// Nested message and enum types in `LoadRequest`.
pub mod load_request {
    #[allow(clippy::derive_partial_eq_without_eq)]
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum AttachInfo {
        #[prost(message, tag = "2")]
        Xdp(super::XdpAttachInfo),
        #[prost(message, tag = "3")]
        Tc(super::TcAttachInfo),
        #[prost(message, tag = "4")]
        Tracepoint(super::TracepointAttachInfo),
        #[prost(message, tag = "5")]
        Kprobe(super::KprobeAttachInfo),
        #[prost(message, tag = "6")]
        Uprobe(super::UprobeAttachInfo),
        #[prost(message, tag = "7")]
        Fentry(super::FentryAttachInfo),
        #[prost(message, tag = "8")]
        Fexit(super::FexitAttachInfo),
    }
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KernelProgramInfo {
    #[prost(uint32, tag = "1")]
    pub id: u32,
    #[prost(string, tag = "2")]
    pub name: ::prost::alloc::string::String,
    #[prost(uint32, tag = "3")]
    pub program_type: u32,
    #[prost(string, tag = "4")]
    pub loaded_at: ::prost::alloc::string::String,
    #[prost(string, tag = "5")]
    pub tag: ::prost::alloc::string::String,
    #[prost(bool, tag = "6")]
    pub gpl_compatible: bool,
    #[prost(uint32, repeated, tag = "7")]
    pub map_ids: ::prost::alloc::vec::Vec<u32>,
    #[prost(uint32, tag = "8")]
    pub btf_id: u32,
    #[prost(uint32, tag = "9")]
    pub bytes_xlated: u32,
    #[prost(bool, tag = "10")]
    pub jited: bool,
    #[prost(uint32, tag = "11")]
    pub bytes_jited: u32,
    #[prost(uint32, tag = "12")]
    pub bytes_memlock: u32,
    #[prost(uint32, tag = "13")]
    pub verified_insns: u32,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProgramInfo {
    #[prost(map = "string, string", tag = "1")]
    pub metadata: ::std::collections::HashMap<
        ::prost::alloc::string::String,
        ::prost::alloc::string::String,
    >,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LoadResponse {
    #[prost(message, optional, tag = "1")]
    pub kernel_info: ::core::option::Option<KernelProgramInfo>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UnloadRequest {
    #[prost(uint32, tag = "1")]
    pub id: u32,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UnloadResponse {}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListRequest {
    #[prost(uint32, optional, tag = "1")]
    pub program_type: ::core::option::Option<u32>,
    #[prost(bool, optional, tag = "2")]
    pub bpfman_programs_only: ::core::option::Option<bool>,
    #[prost(map = "string, string", tag = "3")]
    pub match_metadata: ::std::collections::HashMap<
        ::prost::alloc::string::String,
        ::prost::alloc::string::String,
    >,
}
/// Nested message and enum types in `ListResponse`.
pub mod list_response {
    #[allow(clippy::derive_partial_eq_without_eq)]
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ListResult {
        #[prost(message, optional, tag = "1")]
        pub info: ::core::option::Option<super::ProgramInfo>,
        #[prost(message, optional, tag = "2")]
        pub kernel_info: ::core::option::Option<super::KernelProgramInfo>,
    }
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListResponse {
    #[prost(message, repeated, tag = "1")]
    pub results: ::prost::alloc::vec::Vec<list_response::ListResult>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetRequest {
    #[prost(uint32, tag = "1")]
    pub id: u32,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetResponse {
    #[prost(message, optional, tag = "1")]
    pub info: ::core::option::Option<ProgramInfo>,
    #[prost(message, optional, tag = "2")]
    pub kernel_info: ::core::option::Option<KernelProgramInfo>,
}
/// Generated client implementations.
pub mod loader_client {
    #![allow(unused_variables, dead_code, missing_docs, clippy::let_unit_value)]
    use tonic::codegen::http::Uri;
    use tonic::codegen::*;

    #[derive(Debug, Clone)]
    pub struct LoaderClient<T> {
        inner: tonic::client::Grpc<T>,
    }
    impl LoaderClient<tonic::transport::Channel> {
        /// Attempt to create a new client by connecting to a given endpoint.
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(conn))
        }
    }
    impl<T> LoaderClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::Error: Into<StdError>,
        T::ResponseBody: Body<Data = Bytes> + Send + 'static,
        <T::ResponseBody as Body>::Error: Into<StdError> + Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }
        pub fn with_origin(inner: T, origin: Uri) -> Self {
            let inner = tonic::client::Grpc::with_origin(inner, origin);
            Self { inner }
        }
        /// Limits the maximum size of a decoded message.
        #[must_use]
        pub fn max_decoding_message_size(mut self, limit: usize) -> Self {
            self.inner = self.inner.max_decoding_message_size(limit);
            self
        }
        pub async fn load(
            &mut self,
            request: impl tonic::IntoRequest<super::LoadRequest>,
        ) -> std::result::Result<tonic::Response<super::LoadResponse>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {e}"),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/bpfman.v1.Loader/Load");
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("bpfman.v1.Loader", "Load"));
            self.inner.unary(req, path, codec).await
        }
        pub async fn unload(
            &mut self,
            request: impl tonic::IntoRequest<super::UnloadRequest>,
        ) -> std::result::Result<tonic::Response<super::UnloadResponse>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {e}"),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/bpfman.v1.Loader/Unload");
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("bpfman.v1.Loader", "Unload"));
            self.inner.unary(req, path, codec).await
        }
        pub async fn list(
            &mut self,
            request: impl tonic::IntoRequest<super::ListRequest>,
        ) -> std::result::Result<tonic::Response<super::ListResponse>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {e}"),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/bpfman.v1.Loader/List");
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("bpfman.v1.Loader", "List"));
            self.inner.unary(req, path, codec).await
        }
        pub async fn get(
            &mut self,
            request: impl tonic::IntoRequest<super::GetRequest>,
        ) -> std::result::Result<tonic::Response<super::GetResponse>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {e}"),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/bpfman.v1.Loader/Get");
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("bpfman.v1.Loader", "Get"));
            self.inner.unary(req, path, codec).await
        }
    }
}
