//! Declared parameter schemas and call-site argument binding.
//!
//! A memoizable operation declares its parameters once as a [`Signature`].
//! Every call supplies [`CallArgs`] (positional values, named values and a
//! free-form options bag), which are bound against the signature into
//! [`BoundArguments`]: the effective `name -> value` mapping after defaults.
//! Two calls that differ only in positional-vs-named form bind to equal
//! mappings.

use std::collections::BTreeMap;

use memoria_types::error::{BindError, CacheError};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::canonical::canonical_json;

/// Option key consulted by the memoization engine. `false` bypasses the cache.
pub const USE_CACHE_OPTION: &str = "use_cache";

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    /// Value applied when the caller omits the argument. `None` means required.
    pub default: Option<Value>,
}

/// Ordered parameter list of a memoizable operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    params: Vec<Param>,
}

impl Signature {
    /// Start declaring a signature.
    pub fn builder() -> SignatureBuilder {
        SignatureBuilder::default()
    }

    /// Build a signature from explicit parameters, rejecting duplicate names.
    pub fn from_params(params: Vec<Param>) -> Result<Self, BindError> {
        for (i, param) in params.iter().enumerate() {
            if params[..i].iter().any(|p| p.name == param.name) {
                return Err(BindError::DuplicateParameter(param.name.clone()));
            }
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Resolve call-site arguments into the effective argument mapping.
    ///
    /// Positional values fill parameters in declaration order, named values
    /// fill by name, defaults fill whatever is left. The options bag is carried
    /// along untouched.
    pub fn bind(&self, args: CallArgs) -> Result<BoundArguments, BindError> {
        let CallArgs {
            positional,
            named,
            options,
        } = args;

        if positional.len() > self.params.len() {
            return Err(BindError::TooManyPositional {
                expected: self.params.len(),
                actual: positional.len(),
            });
        }

        let mut values = BTreeMap::new();
        for (param, value) in self.params.iter().zip(positional) {
            values.insert(param.name.clone(), value);
        }

        for (name, value) in named {
            if self.param(&name).is_none() {
                return Err(BindError::UnknownArgument(name));
            }
            if values.contains_key(&name) {
                return Err(BindError::MultipleValues(name));
            }
            values.insert(name, value);
        }

        for param in &self.params {
            if values.contains_key(&param.name) {
                continue;
            }
            match &param.default {
                Some(default) => {
                    values.insert(param.name.clone(), default.clone());
                }
                None => return Err(BindError::MissingArgument(param.name.clone())),
            }
        }

        Ok(BoundArguments { values, options })
    }
}

/// Builder for [`Signature`].
#[derive(Debug, Default)]
pub struct SignatureBuilder {
    params: Vec<Param>,
}

impl SignatureBuilder {
    /// Declare a parameter without a default.
    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            default: None,
        });
        self
    }

    /// Declare a parameter with a default value.
    pub fn optional(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.params.push(Param {
            name: name.into(),
            default: Some(default.into()),
        });
        self
    }

    pub fn build(self) -> Result<Signature, BindError> {
        Signature::from_params(self.params)
    }
}

/// Arguments as supplied at a call site.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    positional: Vec<Value>,
    named: Vec<(String, Value)>,
    options: Map<String, Value>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Add a named argument.
    pub fn named(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.push((name.into(), value.into()));
        self
    }

    /// Add an entry to the options bag. Options never affect the fingerprint.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Shorthand for the `use_cache` option.
    pub fn use_cache(self, enabled: bool) -> Self {
        self.option(USE_CACHE_OPTION, enabled)
    }
}

/// The effective arguments of a call, keyed by parameter name.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundArguments {
    values: BTreeMap<String, Value>,
    options: Map<String, Value>,
}

impl BoundArguments {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Deserialize a single argument.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, serde_json::Error> {
        let value = self.values.get(name).cloned().unwrap_or(Value::Null);
        serde_json::from_value(value)
    }

    /// Deserialize the whole mapping into a typed argument struct.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.values.clone().into_iter().collect()))
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// The caller's options bag, excluded from fingerprinting.
    pub fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    /// Whether this call may read and write the cache. Defaults to `true`;
    /// a non-boolean `use_cache` value is ignored.
    pub fn cache_enabled(&self) -> bool {
        self.options
            .get(USE_CACHE_OPTION)
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    /// Canonical JSON of the argument mapping (options excluded).
    pub fn canonical_json(&self) -> Result<String, CacheError> {
        let object: Map<String, Value> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        canonical_json(&Value::Object(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn generate_signature() -> Signature {
        Signature::builder()
            .required("messages")
            .optional("model_args", json!({}))
            .build()
            .unwrap()
    }

    #[test]
    fn test_positional_and_named_bind_equally() {
        let sig = generate_signature();
        let a = sig
            .bind(CallArgs::new().arg(json!(["hi"])).arg(json!({"model": "m"})))
            .unwrap();
        let b = sig
            .bind(
                CallArgs::new()
                    .named("model_args", json!({"model": "m"}))
                    .named("messages", json!(["hi"])),
            )
            .unwrap();
        assert_eq!(a.values(), b.values());
        assert_eq!(a.canonical_json().unwrap(), b.canonical_json().unwrap());
    }

    #[test]
    fn test_defaults_are_applied() {
        let sig = generate_signature();
        let bound = sig.bind(CallArgs::new().arg("hello")).unwrap();
        assert_eq!(bound.get("model_args"), Some(&json!({})));
    }

    #[test]
    fn test_explicit_default_matches_omitted_default() {
        let sig = generate_signature();
        let omitted = sig.bind(CallArgs::new().arg("x")).unwrap();
        let explicit = sig
            .bind(CallArgs::new().arg("x").named("model_args", json!({})))
            .unwrap();
        assert_eq!(omitted.canonical_json().unwrap(), explicit.canonical_json().unwrap());
    }

    #[test]
    fn test_missing_required_argument() {
        let sig = generate_signature();
        let err = sig.bind(CallArgs::new()).unwrap_err();
        assert_eq!(err, BindError::MissingArgument("messages".to_string()));
    }

    #[test]
    fn test_too_many_positional() {
        let sig = generate_signature();
        let err = sig
            .bind(CallArgs::new().arg(1).arg(2).arg(3))
            .unwrap_err();
        assert_eq!(
            err,
            BindError::TooManyPositional {
                expected: 2,
                actual: 3
            }
        );
    }

    #[test]
    fn test_unknown_and_duplicate_arguments() {
        let sig = generate_signature();
        let err = sig
            .bind(CallArgs::new().arg(1).named("temperature", 0.2))
            .unwrap_err();
        assert_eq!(err, BindError::UnknownArgument("temperature".to_string()));

        let err = sig
            .bind(CallArgs::new().arg(1).named("messages", 2))
            .unwrap_err();
        assert_eq!(err, BindError::MultipleValues("messages".to_string()));
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        let err = Signature::builder()
            .required("x")
            .optional("x", 1)
            .build()
            .unwrap_err();
        assert_eq!(err, BindError::DuplicateParameter("x".to_string()));
    }

    #[test]
    fn test_options_do_not_affect_canonical_json() {
        let sig = generate_signature();
        let plain = sig.bind(CallArgs::new().arg("x")).unwrap();
        let with_options = sig
            .bind(CallArgs::new().arg("x").option("trace_id", "abc").use_cache(true))
            .unwrap();
        assert_eq!(
            plain.canonical_json().unwrap(),
            with_options.canonical_json().unwrap()
        );
        assert_eq!(with_options.options().get("trace_id"), Some(&json!("abc")));
    }

    #[test]
    fn test_cache_enabled_flag() {
        let sig = generate_signature();
        assert!(sig.bind(CallArgs::new().arg("x")).unwrap().cache_enabled());
        assert!(!sig
            .bind(CallArgs::new().arg("x").use_cache(false))
            .unwrap()
            .cache_enabled());
        assert!(sig
            .bind(CallArgs::new().arg("x").option(USE_CACHE_OPTION, "no"))
            .unwrap()
            .cache_enabled());
    }

    #[test]
    fn test_parse_into_typed_struct() {
        #[derive(Deserialize)]
        struct Args {
            messages: String,
            model_args: Value,
        }

        let sig = generate_signature();
        let bound = sig.bind(CallArgs::new().arg("hello")).unwrap();
        let args: Args = bound.parse().unwrap();
        assert_eq!(args.messages, "hello");
        assert_eq!(args.model_args, json!({}));
        assert_eq!(bound.get_as::<String>("messages").unwrap(), "hello");
    }
}
