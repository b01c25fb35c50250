//! Request methods and response codes.

use std::fmt;

/// Request method. Discriminants are the CoAP code bytes (class 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Method {
    Get = 1,
    Post = 2,
    Put = 3,
    Delete = 4,
}

impl Method {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Get),
            2 => Some(Self::Post),
            3 => Some(Self::Put),
            4 => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response code, written `class.detail` (e.g. 4.04).
///
/// Class 2 is success, 4 client error, 5 server error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResponseCode {
    pub class: u8,
    pub detail: u8,
}

pub const CLASS_SUCCESS: u8 = 2;
pub const CLASS_CLIENT_ERROR: u8 = 4;
pub const CLASS_SERVER_ERROR: u8 = 5;

impl ResponseCode {
    pub const CREATED: Self = Self::new(CLASS_SUCCESS, 1);
    pub const DELETED: Self = Self::new(CLASS_SUCCESS, 2);
    pub const VALID: Self = Self::new(CLASS_SUCCESS, 3);
    pub const CHANGED: Self = Self::new(CLASS_SUCCESS, 4);
    pub const CONTENT: Self = Self::new(CLASS_SUCCESS, 5);
    pub const CONTINUE: Self = Self::new(CLASS_SUCCESS, 31);

    pub const BAD_REQUEST: Self = Self::new(CLASS_CLIENT_ERROR, 0);
    pub const UNAUTHORIZED: Self = Self::new(CLASS_CLIENT_ERROR, 1);
    pub const BAD_OPTION: Self = Self::new(CLASS_CLIENT_ERROR, 2);
    pub const FORBIDDEN: Self = Self::new(CLASS_CLIENT_ERROR, 3);
    pub const NOT_FOUND: Self = Self::new(CLASS_CLIENT_ERROR, 4);
    pub const METHOD_NOT_ALLOWED: Self = Self::new(CLASS_CLIENT_ERROR, 5);
    pub const NOT_ACCEPTABLE: Self = Self::new(CLASS_CLIENT_ERROR, 6);
    pub const REQUEST_ENTITY_INCOMPLETE: Self = Self::new(CLASS_CLIENT_ERROR, 8);
    pub const PRECONDITION_FAILED: Self = Self::new(CLASS_CLIENT_ERROR, 12);
    pub const REQUEST_ENTITY_TOO_LARGE: Self = Self::new(CLASS_CLIENT_ERROR, 13);
    pub const UNSUPPORTED_CONTENT_FORMAT: Self = Self::new(CLASS_CLIENT_ERROR, 15);

    pub const INTERNAL_SERVER_ERROR: Self = Self::new(CLASS_SERVER_ERROR, 0);
    pub const NOT_IMPLEMENTED: Self = Self::new(CLASS_SERVER_ERROR, 1);
    pub const BAD_GATEWAY: Self = Self::new(CLASS_SERVER_ERROR, 2);
    pub const SERVICE_UNAVAILABLE: Self = Self::new(CLASS_SERVER_ERROR, 3);
    pub const GATEWAY_TIMEOUT: Self = Self::new(CLASS_SERVER_ERROR, 4);
    pub const PROXYING_NOT_SUPPORTED: Self = Self::new(CLASS_SERVER_ERROR, 5);

    pub const fn new(class: u8, detail: u8) -> Self {
        Self { class, detail }
    }

    /// Wire byte: `(class << 5) | detail`.
    pub fn as_u8(&self) -> u8 {
        (self.class << 5) | (self.detail & 0x1F)
    }

    pub fn from_u8(value: u8) -> Self {
        Self::new((value >> 5) & 0x7, value & 0x1F)
    }

    pub fn is_success(&self) -> bool {
        self.class == CLASS_SUCCESS
    }

    pub fn is_client_error(&self) -> bool {
        self.class == CLASS_CLIENT_ERROR
    }

    pub fn is_server_error(&self) -> bool {
        self.class == CLASS_SERVER_ERROR
    }

    /// Client or server error.
    pub fn is_error(&self) -> bool {
        self.is_client_error() || self.is_server_error()
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.class, self.detail)
    }
}
