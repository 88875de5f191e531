//! Message type codes exchanged with the proxy.
//!
//! Codes are grouped by family: client (1..), workflow (100..) and
//! activity (200..). Every request has exactly one reply type, which is
//! always the next code.

use std::fmt;

/// How a message participates in the request/reply protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Expects exactly one reply carrying the same request id
    Request,
    /// Answers a request
    Reply,
    /// Fire-and-forget notification, request id is zero
    Event,
}

macro_rules! message_types {
    (
        requests { $($req:ident = $req_code:literal => $reply:ident = $reply_code:literal,)* }
        events { $($event:ident = $event_code:literal,)* }
    ) => {
        /// Message type code carried by every frame.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(i32)]
        pub enum MessageType {
            $($req = $req_code, $reply = $reply_code,)*
            $($event = $event_code,)*
        }

        impl MessageType {
            /// Every known message type.
            pub const ALL: &'static [MessageType] = &[
                $(MessageType::$req, MessageType::$reply,)*
                $(MessageType::$event,)*
            ];

            /// Look up a message type by its wire code.
            pub fn from_code(code: i32) -> Option<Self> {
                match code {
                    $($req_code => Some(MessageType::$req), $reply_code => Some(MessageType::$reply),)*
                    $($event_code => Some(MessageType::$event),)*
                    _ => None,
                }
            }

            /// The reply type a request of this type expects.
            pub fn reply_type(self) -> Option<MessageType> {
                match self {
                    $(MessageType::$req => Some(MessageType::$reply),)*
                    _ => None,
                }
            }

            /// The request type this reply answers.
            pub fn request_type(self) -> Option<MessageType> {
                match self {
                    $(MessageType::$reply => Some(MessageType::$req),)*
                    _ => None,
                }
            }

            pub fn kind(self) -> MessageKind {
                match self {
                    $(MessageType::$req => MessageKind::Request,)*
                    $(MessageType::$reply => MessageKind::Reply,)*
                    $(MessageType::$event => MessageKind::Event,)*
                }
            }
        }
    };
}

message_types! {
    requests {
        // Client family
        InitializeRequest = 1 => InitializeReply = 2,
        ConnectRequest = 3 => ConnectReply = 4,
        TerminateRequest = 5 => TerminateReply = 6,
        PingRequest = 7 => PingReply = 8,
        CancelRequest = 9 => CancelReply = 10,
        DomainRegisterRequest = 11 => DomainRegisterReply = 12,
        NewWorkerRequest = 13 => NewWorkerReply = 14,
        StopWorkerRequest = 15 => StopWorkerReply = 16,

        // Workflow family
        WorkflowRegisterRequest = 101 => WorkflowRegisterReply = 102,
        WorkflowExecuteRequest = 103 => WorkflowExecuteReply = 104,
        WorkflowInvokeRequest = 105 => WorkflowInvokeReply = 106,
        WorkflowGetResultRequest = 107 => WorkflowGetResultReply = 108,
        WorkflowSignalRequest = 109 => WorkflowSignalReply = 110,
        WorkflowSignalInvokeRequest = 111 => WorkflowSignalInvokeReply = 112,
        WorkflowQueryRequest = 113 => WorkflowQueryReply = 114,
        WorkflowQueryInvokeRequest = 115 => WorkflowQueryInvokeReply = 116,
        WorkflowCancelRequest = 117 => WorkflowCancelReply = 118,
        WorkflowTerminateRequest = 119 => WorkflowTerminateReply = 120,
        WorkflowSleepRequest = 121 => WorkflowSleepReply = 122,
        WorkflowExecuteChildRequest = 123 => WorkflowExecuteChildReply = 124,
        WorkflowWaitForChildRequest = 125 => WorkflowWaitForChildReply = 126,

        // Activity family
        ActivityRegisterRequest = 201 => ActivityRegisterReply = 202,
        ActivityExecuteRequest = 203 => ActivityExecuteReply = 204,
        ActivityInvokeRequest = 205 => ActivityInvokeReply = 206,
        ActivityRecordHeartbeatRequest = 207 => ActivityRecordHeartbeatReply = 208,
        ActivityCompleteRequest = 209 => ActivityCompleteReply = 210,
    }
    events {
        ActivityCancelNotification = 211,
    }
}

impl MessageType {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn is_reply(self) -> bool {
        self.kind() == MessageKind::Reply
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
