use crate::driver::CompilerDriver;
use crate::error::CompilerDriverError;
use async_trait::async_trait;
use futures::future::BoxFuture;

type TransportResult = Result<serde_json::Value, CompilerDriverError>;
type Transport = Box<dyn Fn(String, serde_json::Value) -> BoxFuture<'static, TransportResult> + Send + Sync>;

/// A [`CompilerDriver`] whose actual compile step is an injected transport
/// closure, e.g. an HTTP or gRPC call to a remote compile function. The
/// concrete wire protocol is deliberately left external; this just carries
/// the version/standard-json-in, standard-json-out contract, matching the
/// "two implementations are interchangeable" requirement.
pub struct RemoteCompilerDriver {
    transport: Transport,
}

impl RemoteCompilerDriver {
    pub fn new<F, Fut>(transport: F) -> Self
    where
        F: Fn(String, serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = TransportResult> + Send + 'static,
    {
        Self {
            transport: Box::new(move |version, input| Box::pin(transport(version, input))),
        }
    }
}

#[async_trait]
impl CompilerDriver for RemoteCompilerDriver {
    async fn compile(
        &self,
        version: &str,
        standard_json_input: &serde_json::Value,
    ) -> Result<serde_json::Value, CompilerDriverError> {
        tracing::info!(version = %version, "invoking remote compile function");
        (self.transport)(version.to_string(), standard_json_input.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn delegates_to_injected_transport() {
        let driver = RemoteCompilerDriver::new(|version, input| async move {
            Ok(serde_json::json!({"echoedVersion": version, "echoedInput": input}))
        });

        let result = driver
            .compile("0.8.17", &serde_json::json!({"language": "Solidity"}))
            .await
            .unwrap();

        assert_eq!(result["echoedVersion"], "0.8.17");
        assert_eq!(result["echoedInput"]["language"], "Solidity");
    }

    #[tokio::test]
    async fn surfaces_transport_errors() {
        let driver = RemoteCompilerDriver::new(|_version, _input| async move {
            Err(CompilerDriverError::Transport("connection refused".to_string()))
        });

        let result = driver.compile("0.8.17", &serde_json::json!({})).await;
        assert!(matches!(result, Err(CompilerDriverError::Transport(_))));
    }
}
