//! Fault containment boundary.
//!
//! Everything below the boundary (stages and handler) runs inside
//! `catch_unwind`. A panic, or a wiring fault surfaced by a stage, ends only
//! the current request.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use thiserror::Error;

use crate::security::error::WiringFault;

/// A failure that must never happen in a correctly wired server.
#[derive(Debug, Error)]
pub enum Fault {
    #[error("panic: {0}")]
    Panic(String),

    #[error(transparent)]
    Wiring(#[from] WiringFault),
}

impl Fault {
    pub fn kind(&self) -> &'static str {
        match self {
            Fault::Panic(_) => "panic",
            Fault::Wiring(_) => "wiring",
        }
    }
}

/// Run `future`, converting a panic into [`Fault::Panic`].
pub async fn contain<F, T>(future: F) -> Result<T, Fault>
where
    F: Future<Output = Result<T, Fault>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(Fault::Panic(panic_message(payload.as_ref()))),
    }
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_through_results() {
        assert_eq!(contain(async { Ok::<_, Fault>(7) }).await.unwrap(), 7);

        let err = contain(async { Err::<(), _>(Fault::from(WiringFault::PrincipalMissing)) })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "wiring");
    }

    #[tokio::test]
    async fn converts_panics() {
        let exploded = true;
        let err = contain(async move {
            if exploded {
                panic!("limiter exploded");
            }
            Ok::<(), Fault>(())
        })
        .await
        .unwrap_err();

        match err {
            Fault::Panic(message) => assert_eq!(message, "limiter exploded"),
            other => panic!("unexpected fault {other:?}"),
        }
    }

    #[test]
    fn formats_string_payloads() {
        let owned: Box<dyn Any + Send> = Box::new(format!("index {} out of range", 3));
        assert_eq!(panic_message(owned.as_ref()), "index 3 out of range");

        let other: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}
