// SPDX-License-Identifier: GPL-3.0-only

//! Opportunistic secret obscuring with plaintext fallback

use tracing::{debug, warn};

use crate::executor::MountExecutor;

/// Obscure `secret` through the executor, falling back to the plaintext
///
/// Any failure of the obscuring tool is logged and never propagated.
pub async fn obscure_or_plaintext(executor: &dyn MountExecutor, secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }

    match executor.obscure(secret).await {
        Ok(token) if !token.is_empty() => {
            debug!("Using obscured password");
            token
        }
        Ok(_) => {
            warn!("Password obscuring returned an empty token, using plaintext password");
            secret.to_string()
        }
        Err(e) => {
            warn!("Password obscuring failed, using plaintext password: {}", e);
            secret.to_string()
        }
    }
}
