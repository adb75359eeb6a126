use crate::errors::AgentError;

pub trait ToValidate {
    fn validate(&self) -> Result<(), AgentError>;
}

pub fn validate(validator: &impl ToValidate) -> Result<(), AgentError> {
    validator.validate()
}
