//! Enumerated vocabularies carried on the wire
//!
//! Event types and commands travel as small dense integers. Each vocabulary is
//! a single enum: the name table, the integer table and the iteration order are
//! all derived from the same definition so they cannot drift apart. Adding or
//! removing a variant is a breaking wire format change.

use serde::{Deserialize, Serialize};
use strum::{EnumCount, EnumIter, EnumString, FromRepr, IntoStaticStr};

use crate::error::VocabularyError;

/// Kind of work an event describes
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    IntoStaticStr,
    FromRepr,
    EnumIter,
    EnumCount,
    Serialize,
    Deserialize,
)]
#[serde(into = "u32", try_from = "u32")]
#[repr(u8)]
pub enum EventType {
    #[default]
    #[strum(serialize = "EV_UNKNOWN")]
    Unknown = 0,
    #[strum(serialize = "EV_BASE")]
    Base = 1,
    #[strum(serialize = "EV_SCRIPT")]
    Script = 2,
    #[strum(serialize = "EV_PERL")]
    Perl = 3,
    #[strum(serialize = "EV_BIN")]
    Bin = 4,
    #[strum(serialize = "EV_URL")]
    Url = 5,
    #[strum(serialize = "EV_RESULT")]
    Result = 6,
    #[strum(serialize = "EV_WORKER_DONE")]
    WorkerDone = 7,
    #[strum(serialize = "EV_COMMAND")]
    Command = 8,
    #[strum(serialize = "EV_REPLY")]
    Reply = 9,
    #[strum(serialize = "EV_ERROR")]
    Error = 10,
}

/// Command carried in the system parameters of an `EV_COMMAND` event
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    IntoStaticStr,
    FromRepr,
    EnumIter,
    EnumCount,
    Serialize,
    Deserialize,
)]
#[serde(into = "u32", try_from = "u32")]
#[repr(u8)]
pub enum Command {
    #[default]
    #[strum(serialize = "CMD_NONE")]
    None = 0,
    #[strum(serialize = "CMD_STATS")]
    Stats = 1,
    #[strum(serialize = "CMD_RESET_STATS")]
    ResetStats = 2,
    #[strum(serialize = "CMD_REOPEN_LOG")]
    ReopenLog = 3,
    #[strum(serialize = "CMD_REREAD_CONF")]
    RereadConf = 4,
    #[strum(serialize = "CMD_EXIT_WHEN_DONE")]
    ExitWhenDone = 5,
    #[strum(serialize = "CMD_SEND_UDP_PACKET")]
    SendUdpPacket = 6,
    #[strum(serialize = "CMD_TIMER_SIGNAL")]
    TimerSignal = 7,
    #[strum(serialize = "CMD_CHILD_SIGNAL")]
    ChildSignal = 8,
    #[strum(serialize = "CMD_APP")]
    App = 9,
    #[strum(serialize = "CMD_SHUTDOWN")]
    Shutdown = 10,
    #[strum(serialize = "CMD_NUCLEUS_CONF")]
    NucleusConf = 11,
    #[strum(serialize = "CMD_DUMP_STATE")]
    DumpState = 12,
    #[strum(serialize = "CMD_NETWORKIF_CONF")]
    NetworkIfConf = 13,
    #[strum(serialize = "CMD_END_OF_QUEUE")]
    EndOfQueue = 14,
    #[strum(serialize = "CMD_MAIN_CONF")]
    MainConf = 15,
    #[strum(serialize = "CMD_PERSISTENT_APP")]
    PersistentApp = 16,
    #[strum(serialize = "CMD_EVENT")]
    Event = 17,
    #[strum(serialize = "CMD_WORKER_CONF")]
    WorkerConf = 18,
}

macro_rules! vocabulary {
    ($ty:ident, $label:literal) => {
        impl $ty {
            /// Human-readable vocabulary name used in diagnostics
            pub const VOCABULARY: &'static str = $label;

            /// Look up a variant by its symbolic wire name (e.g. `EV_URL`)
            pub fn from_name(name: &str) -> Result<Self, VocabularyError> {
                name.parse::<Self>()
                    .map_err(|_| VocabularyError::UnknownName {
                        vocabulary: Self::VOCABULARY,
                        name: name.to_string(),
                    })
            }

            /// Look up a variant by its wire integer
            pub fn from_code(value: u32) -> Result<Self, VocabularyError> {
                u8::try_from(value)
                    .ok()
                    .and_then(Self::from_repr)
                    .ok_or(VocabularyError::OutOfRange {
                        vocabulary: Self::VOCABULARY,
                        value,
                        len: <Self as EnumCount>::COUNT,
                    })
            }

            /// Symbolic wire name
            pub fn name(self) -> &'static str {
                self.into()
            }

            /// Wire integer
            pub fn code(self) -> u32 {
                self as u32
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl From<$ty> for u32 {
            fn from(value: $ty) -> Self {
                value.code()
            }
        }

        impl TryFrom<u32> for $ty {
            type Error = VocabularyError;

            fn try_from(value: u32) -> Result<Self, VocabularyError> {
                Self::from_code(value)
            }
        }
    };
}

vocabulary!(EventType, "event type");
vocabulary!(Command, "command");
