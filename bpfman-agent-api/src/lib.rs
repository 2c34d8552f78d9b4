// SPDX-License-Identifier: (MIT OR Apache-2.0)
// Copyright Authors of bpfman

#[path = "loader.v1.rs"]
#[rustfmt::skip]
#[allow(clippy::all)]
pub mod v1;

use thiserror::Error;

/// Metadata key under which the owning `BpfProgram` object's UID is stored
/// on every program this agent loads. `ListByProgramType` filters on this
/// key's presence to distinguish agent-owned programs from anything loaded
/// by a third party.
pub const METADATA_UUID: &str = "uuid";
/// Metadata key carrying the name of the owning Program custom resource.
pub const METADATA_PROGRAM_NAME: &str = "program-name";

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("{program} is not a valid program type")]
    InvalidProgramType { program: String },
    #[error("{proceedon} is not a valid proceed-on value")]
    InvalidProceedOn { proceedon: String },
    #[error("{direction} is not a valid direction")]
    InvalidDirection { direction: String },
    #[error("{pull_policy} is not a valid image pull policy")]
    InvalidImagePullPolicy { pull_policy: String },
}

/// Kernel program types the loader accepts. Only the subset this agent's
/// seven Program kinds attach as is modelled; the loader's wire type is a
/// superset but the agent never needs the rest.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub enum KernelProgramType {
    Xdp,
    Tc,
    Tracepoint,
    /// Kprobe and Uprobe share this kernel type; disambiguate by
    /// `program-name` metadata, not by kernel type.
    Kprobe,
    /// Fentry and Fexit share this kernel type (`BPF_PROG_TYPE_TRACING`).
    Tracing,
}

impl From<KernelProgramType> for u32 {
    fn from(value: KernelProgramType) -> Self {
        match value {
            KernelProgramType::Xdp => 6,
            KernelProgramType::Tc => 3,
            KernelProgramType::Tracepoint => 5,
            KernelProgramType::Kprobe => 2,
            KernelProgramType::Tracing => 26,
        }
    }
}

impl std::fmt::Display for KernelProgramType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let v = match self {
            KernelProgramType::Xdp => "xdp",
            KernelProgramType::Tc => "tc",
            KernelProgramType::Tracepoint => "tracepoint",
            KernelProgramType::Kprobe => "kprobe",
            KernelProgramType::Tracing => "tracing",
        };
        write!(f, "{v}")
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ImagePullPolicy {
    Always,
    IfNotPresent,
    Never,
}

impl Default for ImagePullPolicy {
    fn default() -> Self {
        ImagePullPolicy::IfNotPresent
    }
}

impl From<ImagePullPolicy> for i32 {
    fn from(value: ImagePullPolicy) -> Self {
        match value {
            ImagePullPolicy::Always => 0,
            ImagePullPolicy::IfNotPresent => 1,
            ImagePullPolicy::Never => 2,
        }
    }
}

impl TryFrom<i32> for ImagePullPolicy {
    type Error = ParseError;
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => ImagePullPolicy::Always,
            1 => ImagePullPolicy::IfNotPresent,
            2 => ImagePullPolicy::Never,
            other => {
                return Err(ParseError::InvalidImagePullPolicy {
                    pull_policy: other.to_string(),
                })
            }
        })
    }
}

impl std::fmt::Display for ImagePullPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let v = match self {
            ImagePullPolicy::Always => "Always",
            ImagePullPolicy::IfNotPresent => "IfNotPresent",
            ImagePullPolicy::Never => "Never",
        };
        write!(f, "{v}")
    }
}

/// A single entry of the XDP `proceed-on` action list, encoded bit-exactly
/// with the loader's own numbering.
#[derive(Copy, Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum XdpProceedOnEntry {
    Aborted,
    Drop,
    Pass,
    Tx,
    Redirect,
    DispatcherReturn,
}

impl From<XdpProceedOnEntry> for i32 {
    fn from(value: XdpProceedOnEntry) -> Self {
        match value {
            XdpProceedOnEntry::Aborted => 0,
            XdpProceedOnEntry::Drop => 1,
            XdpProceedOnEntry::Pass => 2,
            XdpProceedOnEntry::Tx => 3,
            XdpProceedOnEntry::Redirect => 4,
            XdpProceedOnEntry::DispatcherReturn => 31,
        }
    }
}

impl TryFrom<String> for XdpProceedOnEntry {
    type Error = ParseError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(match value.as_str() {
            "aborted" => XdpProceedOnEntry::Aborted,
            "drop" => XdpProceedOnEntry::Drop,
            "pass" => XdpProceedOnEntry::Pass,
            "tx" => XdpProceedOnEntry::Tx,
            "redirect" => XdpProceedOnEntry::Redirect,
            "dispatcher_return" => XdpProceedOnEntry::DispatcherReturn,
            proceedon => {
                return Err(ParseError::InvalidProceedOn {
                    proceedon: proceedon.to_string(),
                })
            }
        })
    }
}

/// An ordered `proceed-on` list. Order matters for the per-child diff.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct XdpProceedOn(pub Vec<XdpProceedOnEntry>);

impl XdpProceedOn {
    pub fn from_strings<T: AsRef<[String]>>(values: T) -> Result<Self, ParseError> {
        values
            .as_ref()
            .iter()
            .cloned()
            .map(XdpProceedOnEntry::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map(XdpProceedOn)
    }

    pub fn as_i32_vec(&self) -> Vec<i32> {
        self.0.iter().map(|e| i32::from(*e)).collect()
    }
}

/// A single entry of the TC `proceed-on` action list. `Unspec`
/// is `-1` and is the one entry whose wire encoding is negative.
#[derive(Copy, Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum TcProceedOnEntry {
    Unspec,
    Ok,
    Reclassify,
    Shot,
    Pipe,
    Stolen,
    Queued,
    Repeat,
    Redirect,
    Trap,
    DispatcherReturn,
}

impl From<TcProceedOnEntry> for i32 {
    fn from(value: TcProceedOnEntry) -> Self {
        match value {
            TcProceedOnEntry::Unspec => -1,
            TcProceedOnEntry::Ok => 0,
            TcProceedOnEntry::Reclassify => 1,
            TcProceedOnEntry::Shot => 2,
            TcProceedOnEntry::Pipe => 3,
            TcProceedOnEntry::Stolen => 4,
            TcProceedOnEntry::Queued => 5,
            TcProceedOnEntry::Repeat => 6,
            TcProceedOnEntry::Redirect => 7,
            TcProceedOnEntry::Trap => 8,
            TcProceedOnEntry::DispatcherReturn => 30,
        }
    }
}

impl TryFrom<String> for TcProceedOnEntry {
    type Error = ParseError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(match value.as_str() {
            "unspec" => TcProceedOnEntry::Unspec,
            "ok" => TcProceedOnEntry::Ok,
            "reclassify" => TcProceedOnEntry::Reclassify,
            "shot" => TcProceedOnEntry::Shot,
            "pipe" => TcProceedOnEntry::Pipe,
            "stolen" => TcProceedOnEntry::Stolen,
            "queued" => TcProceedOnEntry::Queued,
            "repeat" => TcProceedOnEntry::Repeat,
            "redirect" => TcProceedOnEntry::Redirect,
            "trap" => TcProceedOnEntry::Trap,
            "dispatcher_return" => TcProceedOnEntry::DispatcherReturn,
            proceedon => {
                return Err(ParseError::InvalidProceedOn {
                    proceedon: proceedon.to_string(),
                })
            }
        })
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TcProceedOn(pub Vec<TcProceedOnEntry>);

impl TcProceedOn {
    pub fn from_strings<T: AsRef<[String]>>(values: T) -> Result<Self, ParseError> {
        values
            .as_ref()
            .iter()
            .cloned()
            .map(TcProceedOnEntry::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map(TcProceedOn)
    }

    pub fn as_i32_vec(&self) -> Vec<i32> {
        self.0.iter().map(|e| i32::from(*e)).collect()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TcDirection {
    Ingress,
    Egress,
}

impl std::fmt::Display for TcDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let v = match self {
            TcDirection::Ingress => "ingress",
            TcDirection::Egress => "egress",
        };
        write!(f, "{v}")
    }
}

impl TryFrom<&str> for TcDirection {
    type Error = ParseError;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Ok(match value {
            "ingress" => TcDirection::Ingress,
            "egress" => TcDirection::Egress,
            direction => {
                return Err(ParseError::InvalidDirection {
                    direction: direction.to_string(),
                })
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xdp_proceed_on_codes_match_loader_numbering() {
        let p = XdpProceedOn::from_strings(["pass".to_string(), "dispatcher_return".to_string()])
            .expect("valid proceed-on list");
        assert_eq!(p.as_i32_vec(), vec![2, 31]);
    }

    #[test]
    fn tc_proceed_on_codes_match_loader_numbering() {
        let p = TcProceedOn::from_strings(["pipe".to_string(), "dispatcher_return".to_string()])
            .expect("valid proceed-on list");
        assert_eq!(p.as_i32_vec(), vec![3, 30]);
    }

    #[test]
    fn tc_proceed_on_unspec_is_negative_one() {
        let p = TcProceedOn::from_strings(["unspec".to_string()]).expect("valid proceed-on list");
        assert_eq!(p.as_i32_vec(), vec![-1]);
    }

    #[test]
    fn unknown_proceed_on_value_is_rejected() {
        assert!(XdpProceedOn::from_strings(["bogus".to_string()]).is_err());
    }

    #[test]
    fn pull_policy_default_is_if_not_present() {
        assert_eq!(ImagePullPolicy::default(), ImagePullPolicy::IfNotPresent);
    }

    #[test]
    fn pull_policy_round_trips_through_wire_code() {
        for policy in [
            ImagePullPolicy::Always,
            ImagePullPolicy::IfNotPresent,
            ImagePullPolicy::Never,
        ] {
            let code: i32 = policy.into();
            assert_eq!(ImagePullPolicy::try_from(code).unwrap(), policy);
        }
    }

    #[test]
    fn kprobe_and_uprobe_share_one_kernel_type() {
        assert_eq!(
            u32::from(KernelProgramType::Kprobe),
            u32::from(KernelProgramType::Kprobe)
        );
    }
}
