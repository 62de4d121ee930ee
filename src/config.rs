//! Service definition parsing and validation.
//!
//! The configuration format is the Consul agent's own services/checks JSON
//! (https://www.consul.io/docs/agent/services.html). The announcer validates only
//! what it needs (names, IDs and TTL checks) and passes everything else through
//! to the agent untouched.

use indexmap::IndexMap;
use serde_json::Value;

use crate::errors::Error;
use crate::utils::CiMap;

/// Resolve the `--config` value: `@path` means "read the file at path",
/// anything else is the JSON document itself.
pub fn load_config(source: &str) -> Result<String, Error> {
    match source.strip_prefix('@') {
        Some(path) => {
            tracing::info!("Parsing services definition in \"{}\" config file", path);
            Ok(std::fs::read_to_string(path)?)
        }
        None => {
            tracing::info!("Parsing services definition: {}", source);
            Ok(source.to_string())
        }
    }
}

/// One health check attached to a service. The body is opaque; the announcer only
/// cares whether a `ttl` field is present.
#[derive(Debug, Clone)]
pub struct CheckDefinition {
    /// Synthesized from the owning service: `service:<id>` for a singular `check`,
    /// `service:<id>:<n>` (1-based) for entries of a `checks` array.
    pub id: String,
    pub raw: CiMap,
}

impl CheckDefinition {
    pub fn ttl(&self) -> Option<&Value> {
        self.raw.get("ttl")
    }

    pub fn is_ttl(&self) -> bool {
        self.raw.contains("ttl")
    }
}

/// One service to announce. `raw` is the full original body, registered with the
/// agent as-is.
#[derive(Debug, Clone)]
pub struct ServiceDefinition {
    pub id: String,
    pub name: String,
    pub raw: CiMap,
    pub checks: Vec<CheckDefinition>,
}

/// Validated, immutable view of the whole configuration.
#[derive(Debug, Default)]
pub struct ConfigModel {
    services: IndexMap<String, ServiceDefinition>,
    ttl_checks: IndexMap<String, CheckDefinition>,
}

impl ConfigModel {
    /// Parse and validate a raw JSON document.
    ///
    /// Reads the singular `service` key first, then the `services` array, with
    /// duplicate-ID detection done incrementally so the first collision is the one
    /// reported. Key lookups are case-insensitive at every level.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let document: Value = serde_json::from_str(raw)?;
        let root = CiMap::from_value(&document).ok_or_else(|| {
            Error::ImproperlyConfigured(format!("config must be a JSON object: {document}"))
        })?;

        let mut model = ConfigModel::default();

        if let Some(service_conf) = root.get("service") {
            model.parse_service(service_conf)?;
        }

        if let Some(services) = root.get("services") {
            let list = services.as_array().ok_or_else(|| {
                Error::ImproperlyConfigured(format!("\"services\" must be an array in {document}"))
            })?;
            for service_conf in list {
                model.parse_service(service_conf)?;
            }
        }

        if model.services.is_empty() {
            return Err(Error::ImproperlyConfigured(
                "please specify either \"service\" config or non-empty \"services\" list".into(),
            ));
        }

        Ok(model)
    }

    fn parse_service(&mut self, conf: &Value) -> Result<(), Error> {
        let raw = CiMap::from_value(conf).ok_or_else(|| {
            Error::ImproperlyConfigured(format!("service definition must be an object: {conf}"))
        })?;

        let name = match raw.get("name") {
            Some(Value::String(name)) => name.clone(),
            Some(other) => {
                return Err(Error::ImproperlyConfigured(format!(
                    "\"name\" must be a string, got {other} in {conf}"
                )))
            }
            None => {
                return Err(Error::ImproperlyConfigured(format!(
                    "\"name\" is missing in {conf}"
                )))
            }
        };

        let id = match raw.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(other) => {
                return Err(Error::ImproperlyConfigured(format!(
                    "\"id\" must be a string, got {other} in {conf}"
                )))
            }
            None => name.clone(),
        };

        if self.services.contains_key(&id) {
            return Err(Error::ImproperlyConfigured(format!(
                "service ID \"{id}\" is duplicated"
            )));
        }

        let mut checks = Vec::new();

        if let Some(check_conf) = raw.get("check") {
            checks.push(self.parse_check(check_conf, format!("service:{id}"))?);
        }

        if let Some(checks_value) = raw.get("checks") {
            let list = checks_value.as_array().ok_or_else(|| {
                Error::ImproperlyConfigured(format!("\"checks\" must be an array in {conf}"))
            })?;
            for (index, check_conf) in list.iter().enumerate() {
                checks.push(self.parse_check(check_conf, format!("service:{id}:{}", index + 1))?);
            }
        }

        self.services.insert(
            id.clone(),
            ServiceDefinition {
                id,
                name,
                raw,
                checks,
            },
        );

        Ok(())
    }

    /// No validation of the check body itself; TTL-bearing checks are indexed so the
    /// keepalive loop can renew them.
    fn parse_check(&mut self, conf: &Value, check_id: String) -> Result<CheckDefinition, Error> {
        let raw = CiMap::from_value(conf).ok_or_else(|| {
            Error::ImproperlyConfigured(format!("check definition must be an object: {conf}"))
        })?;

        let check = CheckDefinition { id: check_id, raw };
        if check.is_ttl() {
            self.ttl_checks.insert(check.id.clone(), check.clone());
        }

        Ok(check)
    }

    pub fn services(&self) -> &IndexMap<String, ServiceDefinition> {
        &self.services
    }

    pub fn ttl_checks(&self) -> &IndexMap<String, CheckDefinition> {
        &self.ttl_checks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singular_service_with_ttl_check() {
        let model =
            ConfigModel::parse(r#"{"service": {"name": "simple service", "check": {"ttl": "8s"}}}"#)
                .unwrap();
        assert_eq!(model.services().len(), 1);
        assert_eq!(model.ttl_checks().len(), 1);
        assert!(model.ttl_checks().contains_key("service:simple service"));
    }

    #[test]
    fn test_services_array_and_check_ids() {
        let model = ConfigModel::parse(
            r#"{
                "services": [
                    {"name": "web", "checks": [
                        {"script": "/bin/check", "interval": "10s"},
                        {"ttl": "15s"}
                    ]},
                    {"name": "worker", "id": "worker-1"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(model.services().len(), 2);
        assert!(model.services().contains_key("web"));
        assert!(model.services().contains_key("worker-1"));
        // Only the TTL-bearing check is indexed, under its 1-based position.
        assert_eq!(model.ttl_checks().len(), 1);
        assert!(model.ttl_checks().contains_key("service:web:2"));
        assert_eq!(model.services()["web"].checks.len(), 2);
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let model = ConfigModel::parse(
            r#"{"Services": [{"Name": "web", "ID": "web-1", "Check": {"TTL": "15s"}}]}"#,
        )
        .unwrap();
        assert!(model.services().contains_key("web-1"));
        assert!(model.ttl_checks().contains_key("service:web-1"));
    }

    #[test]
    fn test_name_is_required() {
        let err = ConfigModel::parse(r#"{"service": {"id": "anonymous"}}"#).unwrap_err();
        assert!(matches!(err, Error::ImproperlyConfigured(_)));
        assert!(err.to_string().contains("\"name\" is missing"));
    }

    #[test]
    fn test_duplicate_id_across_forms_is_reported() {
        let err = ConfigModel::parse(
            r#"{"service": {"name": "web"}, "services": [{"name": "web"}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("service ID \"web\" is duplicated"));
    }

    #[test]
    fn test_duplicate_explicit_and_derived_id() {
        let err = ConfigModel::parse(
            r#"{"services": [{"name": "api"}, {"name": "other", "id": "api"}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("service ID \"api\" is duplicated"));
    }

    #[test]
    fn test_services_must_be_an_array() {
        let err = ConfigModel::parse(r#"{"services": {"name": "web"}}"#).unwrap_err();
        assert!(err.to_string().contains("\"services\" must be an array"));
    }

    #[test]
    fn test_checks_must_be_an_array() {
        let err =
            ConfigModel::parse(r#"{"service": {"name": "web", "checks": {"ttl": "8s"}}}"#)
                .unwrap_err();
        assert!(err.to_string().contains("\"checks\" must be an array"));
    }

    #[test]
    fn test_empty_config_is_an_error() {
        let err = ConfigModel::parse(r#"{"services": []}"#).unwrap_err();
        assert!(matches!(err, Error::ImproperlyConfigured(_)));
        let err = ConfigModel::parse("{}").unwrap_err();
        assert!(matches!(err, Error::ImproperlyConfigured(_)));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            ConfigModel::parse(r#"{"wrong raw JSON"}"#),
            Err(Error::Json(_))
        ));
        assert!(matches!(
            ConfigModel::parse(r#""just a string""#),
            Err(Error::ImproperlyConfigured(_))
        ));
    }

    #[test]
    fn test_load_config_inline_and_file() {
        assert_eq!(load_config("{}").unwrap(), "{}");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("services.json");
        std::fs::write(&path, r#"{"service": {"name": "web"}}"#).unwrap();
        let loaded = load_config(&format!("@{}", path.display())).unwrap();
        assert!(loaded.contains("web"));

        assert!(matches!(
            load_config("@/definitely/not/a/file.json"),
            Err(Error::Io(_))
        ));
    }
}
