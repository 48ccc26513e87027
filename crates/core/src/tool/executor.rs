use std::collections::BTreeMap;

use research_agent_model::{ModelTool, ToolCallRequest};

use crate::tool::{BoxedToolFuture, Error, ToolObject, ToolResult};

/// A tool call ready to run, or the error to report in its place.
pub(crate) struct PreparedCall {
    pub id: String,
    pub name: String,
    pub step: Option<String>,
    pub call: Result<BoxedToolFuture, Error>,
}

impl PreparedCall {
    pub async fn run(self) -> (String, Option<String>, ToolResult) {
        let result = match self.call {
            Ok(fut) => fut.await,
            Err(err) => Err(err),
        };
        (self.id, self.step, result)
    }
}

/// Looks up and runs the tools the model asks for.
#[derive(Default)]
pub(crate) struct Executor {
    tools: BTreeMap<String, Box<dyn ToolObject>>,
}

impl Executor {
    pub fn with_tools(tools: Vec<Box<dyn ToolObject>>) -> Self {
        let mut map = BTreeMap::new();
        for tool in tools {
            let name = tool.name().to_owned();
            if map.insert(name.clone(), tool).is_some() {
                warn!("tool `{name}` registered twice, keeping the last one");
            }
        }
        Self { tools: map }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn definitions(&self) -> Vec<ModelTool> {
        self.tools
            .values()
            .map(|tool| ModelTool {
                name: tool.name().to_owned(),
                description: tool.description().to_owned(),
                parameters: tool.parameter_schema().clone(),
            })
            .collect()
    }

    pub fn prepare(&self, req: ToolCallRequest) -> PreparedCall {
        let ToolCallRequest { id, name, arguments } = req;
        let prepared = match self.tools.get(&name) {
            Some(tool) => {
                trace!("preparing tool `{name}` ({id}) with args: {arguments}");
                tool.prepare(arguments)
            }
            None => {
                warn!("tool not found: {name}");
                Err(Error::not_found().with_reason(format!("no tool named `{name}`")))
            }
        };
        let (step, call) = match prepared {
            Ok((step, fut)) => (Some(step), Ok(fut)),
            Err(err) => (None, Err(err)),
        };
        PreparedCall {
            id,
            name,
            step,
            call,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::ready;

    use serde::Deserialize;
    use serde_json::{Value, json};

    use super::*;
    use crate::tool::{AnyTool, ErrorKind, Tool, ToolOutput};

    #[derive(Deserialize)]
    struct LookupInput {
        term: String,
    }

    struct LookupTool {
        schema: Value,
    }

    impl Tool for LookupTool {
        type Input = LookupInput;

        fn name(&self) -> &str {
            "lookup"
        }

        fn description(&self) -> &str {
            "Looks a term up"
        }

        fn parameter_schema(&self) -> &Value {
            &self.schema
        }

        fn describe_call(&self, input: &LookupInput) -> String {
            format!("Looked up: {}", input.term)
        }

        fn execute(
            &self,
            input: LookupInput,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            ready(Ok(ToolOutput::new(input.term.to_uppercase())
                .with_source("dictionary")))
        }
    }

    fn executor() -> Executor {
        Executor::with_tools(vec![Box::new(AnyTool(LookupTool {
            schema: json!({ "type": "object" }),
        }))])
    }

    fn request(name: &str, arguments: Value) -> ToolCallRequest {
        ToolCallRequest {
            id: "call_1".to_owned(),
            name: name.to_owned(),
            arguments,
        }
    }

    #[test]
    fn test_definitions() {
        let defs = executor().definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "lookup");
        assert_eq!(defs[0].parameters, json!({ "type": "object" }));
        assert!(Executor::default().is_empty());
    }

    #[tokio::test]
    async fn test_run_known_tool() {
        let call = executor().prepare(request("lookup", json!({ "term": "rust" })));
        assert_eq!(call.name, "lookup");
        let (id, step, result) = call.run().await;
        assert_eq!(id, "call_1");
        assert_eq!(step.as_deref(), Some("Looked up: rust"));
        assert_eq!(
            result.unwrap(),
            ToolOutput::new("RUST").with_source("dictionary")
        );
    }

    #[tokio::test]
    async fn test_invalid_and_unknown_calls() {
        let executor = executor();

        let (_, step, result) = executor
            .prepare(request("lookup", json!({ "word": "rust" })))
            .run()
            .await;
        assert!(step.is_none());
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidInput);

        let (_, step, result) = executor
            .prepare(request("read_file", json!({})))
            .run()
            .await;
        assert!(step.is_none());
        assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
    }
}
