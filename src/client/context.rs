/// Caller identification sent with every request.
///
/// The top-level method names the public call the user made; the low-level method
/// names the request actually being sent on its behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    pub caller: String,
    pub top_level_method: String,
    pub low_level_method: String,
}

impl CallContext {
    pub const DEFAULT_CALLER: &'static str = "client";

    /// Context for a top-level call to `method`.
    pub fn new(method: impl Into<String>) -> Self {
        let method = method.into();
        Self {
            caller: Self::DEFAULT_CALLER.to_string(),
            top_level_method: method.clone(),
            low_level_method: method,
        }
    }

    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = caller.into();
        self
    }

    /// Same caller and top-level method, different low-level step.
    pub fn low_level(&self, method: impl Into<String>) -> Self {
        Self {
            caller: self.caller.clone(),
            top_level_method: self.top_level_method.clone(),
            low_level_method: method.into(),
        }
    }

    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("X-Caller-Context", self.caller.clone()),
            ("X-Top-Level-Method", self.top_level_method.clone()),
            ("X-Low-Level-Method", self.low_level_method.clone()),
        ]
    }
}
