use super::{BlockType, FlowRule, ParamKey};
use std::fmt;
use std::sync::Arc;

/// BlockError indicates the request was rejected by an admission rule.
/// It is the expected, high-frequency outcome of flow control and must stay
/// distinguishable from configuration or infrastructure failures.
#[derive(Debug, Clone, Default)]
pub struct BlockError {
    block_type: BlockType,
    // block_msg provides additional message for the block error.
    block_msg: String,
    // name of the resource whose rule rejected the request
    resource: String,
    rule: Option<Arc<dyn FlowRule>>,
    // the parameter value that triggered the rejection
    triggered_value: Option<ParamKey>,
}

impl PartialEq for BlockError {
    fn eq(&self, other: &BlockError) -> bool {
        self.block_type == other.block_type && self.block_msg == other.block_msg
    }
}

impl BlockError {
    pub fn new(block_type: BlockType) -> Self {
        Self {
            block_type,
            ..Self::default()
        }
    }

    pub fn new_with_msg(block_type: BlockType, block_msg: String) -> Self {
        Self {
            block_type,
            block_msg,
            ..Self::default()
        }
    }

    pub fn new_with_cause(
        block_type: BlockType,
        block_msg: String,
        resource: String,
        rule: Arc<dyn FlowRule>,
        triggered_value: ParamKey,
    ) -> Self {
        Self {
            block_type,
            block_msg,
            resource,
            rule: Some(rule),
            triggered_value: Some(triggered_value),
        }
    }

    pub fn block_type(&self) -> BlockType {
        self.block_type
    }

    pub fn block_msg(&self) -> String {
        self.block_msg.clone()
    }

    pub fn resource_name(&self) -> &str {
        &self.resource
    }

    pub fn triggered_rule(&self) -> Option<Arc<dyn FlowRule>> {
        self.rule.clone()
    }

    pub fn triggered_value(&self) -> Option<&ParamKey> {
        self.triggered_value.as_ref()
    }
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.block_msg.is_empty() {
            write!(f, "GatewayBlockError: {}", self.block_type)
        } else {
            write!(
                f,
                "GatewayBlockError: {}, message: {}",
                self.block_type, self.block_msg
            )
        }
    }
}

// lets callers downcast an `anyhow::Error` back to the rejection
impl std::error::Error for BlockError {}
