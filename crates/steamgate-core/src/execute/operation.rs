//! Typed operations over the closed [`Request`] set.

use crate::error::{Error, Result};
use crate::ipc::{Request, Response};

/// A native operation with a typed result.
///
/// `Executor::call` sends [`Operation::request`] to the worker and decodes
/// the answer with [`Operation::decode`].
pub trait Operation {
    type Output;

    fn request(&self) -> Request;

    fn decode(response: Response) -> Result<Self::Output>;
}

fn unexpected(request: Request, response: Response) -> Error {
    Error::UnexpectedResponse(format!(
        "{} answered with {:?}",
        request.name(),
        response
    ))
}

/// Authoritative server time in seconds since the epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerTime;

impl Operation for ServerTime {
    type Output = u64;

    fn request(&self) -> Request {
        Request::ServerTime
    }

    fn decode(response: Response) -> Result<u64> {
        match response {
            Response::ServerTime(time) => Ok(time),
            other => Err(unexpected(Request::ServerTime, other)),
        }
    }
}

/// App id the library is running as.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppId;

impl Operation for AppId {
    type Output = u32;

    fn request(&self) -> Request {
        Request::AppId
    }

    fn decode(response: Response) -> Result<u32> {
        match response {
            Response::AppId(app_id) => Ok(app_id),
            other => Err(unexpected(Request::AppId, other)),
        }
    }
}

/// Whether the local user is logged on.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggedOn;

impl Operation for LoggedOn {
    type Output = bool;

    fn request(&self) -> Request {
        Request::LoggedOn
    }

    fn decode(response: Response) -> Result<bool> {
        match response {
            Response::LoggedOn(logged_on) => Ok(logged_on),
            other => Err(unexpected(Request::LoggedOn, other)),
        }
    }
}

/// 64-bit Steam id of the local user.
#[derive(Debug, Clone, Copy, Default)]
pub struct SteamId;

impl Operation for SteamId {
    type Output = u64;

    fn request(&self) -> Request {
        Request::SteamId
    }

    fn decode(response: Response) -> Result<u64> {
        match response {
            Response::SteamId(id) => Ok(id),
            other => Err(unexpected(Request::SteamId, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_matching_response() {
        assert_eq!(ServerTime::decode(Response::ServerTime(30)).unwrap(), 30);
        assert_eq!(AppId::decode(Response::AppId(480)).unwrap(), 480);
        assert!(LoggedOn::decode(Response::LoggedOn(true)).unwrap());
        assert_eq!(SteamId::decode(Response::SteamId(9)).unwrap(), 9);
    }

    #[test]
    fn test_decode_mismatch() {
        let err = ServerTime::decode(Response::AppId(480)).unwrap_err();
        match err {
            Error::UnexpectedResponse(message) => {
                assert!(message.contains("server-time"));
                assert!(message.contains("AppId(480)"));
            }
            other => panic!("Unexpected error: {:?}", other),
        }
    }
}
