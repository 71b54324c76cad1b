use std::time::Duration;

/// Configuration options for a [`Runtime`](crate::Runtime).
///
/// All fields have sensible defaults (see [`Default`] impl).  Use struct
/// update syntax to override only the options you need:
///
/// # Example
///
/// ```
/// use ding_core::RuntimeOptions;
/// use std::time::Duration;
///
/// let opts = RuntimeOptions {
///     debounce: Duration::from_millis(50),
///     endpoint_prefix: "/api".into(),
///     ..RuntimeOptions::default()
/// };
/// assert_eq!(opts.control_attribute, "u-is");
/// ```
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Quiet window before a widget's queued actions are sent (default: 20ms).
    pub debounce: Duration,
    /// Prefix of every outbound action URL (default: `/$board`).
    pub endpoint_prefix: String,
    /// Attribute naming the behavior of a live control (default: `u-is`).
    pub control_attribute: String,
    /// Attribute naming a template (default: `u-control`).
    pub template_attribute: String,
    /// Attribute requesting secondary attachment (default: `u-behavior`).
    pub behavior_attribute: String,
    /// Element id of the template container (default: `u-templates`).
    pub template_container_id: String,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(20),
            endpoint_prefix: "/$board".into(),
            control_attribute: "u-is".into(),
            template_attribute: "u-control".into(),
            behavior_attribute: "u-behavior".into(),
            template_container_id: "u-templates".into(),
        }
    }
}
