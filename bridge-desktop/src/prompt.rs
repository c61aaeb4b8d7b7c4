//! Terminal prompt for authorization codes

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    prompt::CodePrompt,
};
use std::fmt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::debug;

type LineSource = Box<dyn AsyncBufRead + Send + Unpin>;

/// Prints the consent URL to stderr and reads one line from stdin.
///
/// Output goes to stderr so stdout stays clean for whatever protocol the host
/// process speaks there. One buffered reader is kept for the prompt's
/// lifetime: lines read ahead from piped input stay available to the next
/// call.
pub struct StdinCodePrompt {
    input: Mutex<LineSource>,
}

impl StdinCodePrompt {
    pub fn new() -> Self {
        Self::with_input(BufReader::new(tokio::io::stdin()))
    }

    fn with_input(input: impl AsyncBufRead + Send + Unpin + 'static) -> Self {
        Self {
            input: Mutex::new(Box::new(input)),
        }
    }
}

impl Default for StdinCodePrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdinCodePrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdinCodePrompt").finish_non_exhaustive()
    }
}

#[async_trait]
impl CodePrompt for StdinCodePrompt {
    async fn prompt_for_code(&self, authorization_url: &str) -> Result<String> {
        let mut input = self.input.lock().await;
        let mut writer = tokio::io::stderr();
        read_code(&mut *input, &mut writer, authorization_url).await
    }
}

async fn read_code<R, W>(reader: &mut R, writer: &mut W, authorization_url: &str) -> Result<String>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let banner = format!(
        "Authorize this app by visiting this url: {}\nEnter the code from that page here: ",
        authorization_url
    );
    writer.write_all(banner.as_bytes()).await?;
    writer.flush().await?;

    let mut line = String::new();
    let read = reader.read_line(&mut line).await?;
    if read == 0 {
        return Err(BridgeError::InputClosed);
    }

    debug!(length = line.trim().len(), "Received authorization code from operator");
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_code_trims_line() {
        let mut input: &[u8] = b"  4/0AbCdEf  \n";
        let mut output = Vec::new();

        let code = read_code(&mut input, &mut output, "https://accounts.google.com/auth?x=1")
            .await
            .unwrap();

        assert_eq!(code, "4/0AbCdEf");
        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("https://accounts.google.com/auth?x=1"));
        assert!(shown.ends_with("Enter the code from that page here: "));
    }

    #[tokio::test]
    async fn test_read_code_reads_only_first_line() {
        let mut input: &[u8] = b"first\nsecond\n";
        let mut output = Vec::new();

        let code = read_code(&mut input, &mut output, "url").await.unwrap();
        assert_eq!(code, "first");
    }

    #[tokio::test]
    async fn test_read_code_eof() {
        let mut input: &[u8] = b"";
        let mut output = Vec::new();

        let err = read_code(&mut input, &mut output, "url").await.unwrap_err();
        assert!(matches!(err, BridgeError::InputClosed));
    }

    #[tokio::test]
    async fn test_prompt_keeps_buffered_lines_between_calls() {
        let prompt = StdinCodePrompt::with_input(&b"code-one\ncode-two\n"[..]);

        assert_eq!(prompt.prompt_for_code("first-url").await.unwrap(), "code-one");
        assert_eq!(prompt.prompt_for_code("second-url").await.unwrap(), "code-two");
        assert!(matches!(
            prompt.prompt_for_code("third-url").await,
            Err(BridgeError::InputClosed)
        ));
    }
}
