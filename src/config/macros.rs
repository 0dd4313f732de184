/// Configuration macros for zero-repetition config definitions
///
/// `config_struct!` declares a configuration struct where every field carries
/// its default inline. It generates:
/// - The struct with public fields
/// - The Default implementation
/// - Serde support with `#[serde(default)]`, so partial TOML files work
///
/// # Example
/// ```
/// coinvote::config_struct! {
///     pub struct ExampleConfig {
///         min_interval_ms: u64 = 1500,
///         enabled: bool = true,
///     }
/// }
///
/// let config = ExampleConfig::default();
/// assert_eq!(config.min_interval_ms, 1500);
/// ```
#[macro_export]
macro_rules! config_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_name:ident: $field_type:ty = $default_value:expr
            ),*
            $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                pub $field_name: $field_type,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $(
                        $field_name: $default_value,
                    )*
                }
            }
        }
    };
}
