//! Operator Prompt Abstraction
//!
//! The interactive authorization-code flow needs a human to open a consent
//! URL and paste back the one-time code. That wait is modelled as an async
//! call so the flow can be driven by a terminal in production and by a
//! scripted source in tests.

use async_trait::async_trait;

use crate::error::Result;

/// Source of authorization codes.
///
/// The returned future resolves once the operator has entered a code. There
/// is no built-in timeout: dropping the future (for example from a
/// `tokio::select!` branch) is how callers cancel the wait.
#[async_trait]
pub trait CodePrompt: Send + Sync {
    /// Present `authorization_url` to the operator and wait for the code.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InputClosed`](crate::error::BridgeError::InputClosed)
    /// if the input stream ends before a line is read.
    async fn prompt_for_code(&self, authorization_url: &str) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use mockall::mock;
    use std::sync::Arc;

    mock! {
        Prompt {}

        #[async_trait]
        impl CodePrompt for Prompt {
            async fn prompt_for_code(&self, authorization_url: &str) -> Result<String>;
        }
    }

    #[tokio::test]
    async fn test_prompt_receives_authorization_url() {
        let mut prompt = MockPrompt::new();
        prompt
            .expect_prompt_for_code()
            .withf(|url| url.starts_with("https://accounts.google.com/"))
            .times(1)
            .returning(|_| Ok("4/0Ab-code".to_string()));

        let prompt: Arc<dyn CodePrompt> = Arc::new(prompt);
        let code = prompt
            .prompt_for_code("https://accounts.google.com/o/oauth2/v2/auth?client_id=x")
            .await
            .unwrap();
        assert_eq!(code, "4/0Ab-code");
    }

    #[tokio::test]
    async fn test_prompt_input_closed() {
        let mut prompt = MockPrompt::new();
        prompt
            .expect_prompt_for_code()
            .returning(|_| Err(BridgeError::InputClosed));

        let err = prompt.prompt_for_code("https://example.com").await.unwrap_err();
        assert!(matches!(err, BridgeError::InputClosed));
    }
}
