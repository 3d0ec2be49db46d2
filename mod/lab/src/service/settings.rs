use std::collections::BTreeMap;

use super::{LabError, LabService};

const PREFIX: &str = "settings:";

impl LabService {
    pub fn get_setting(&self, key: &str) -> Result<Option<String>, LabError> {
        let raw = self
            .kv
            .get(&format!("{PREFIX}{key}"))
            .map_err(|e| LabError::Storage(e.to_string()))?;
        match raw {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| LabError::Internal(e.to_string())),
            None => Ok(None),
        }
    }

    pub fn put_setting(&self, key: &str, value: &str) -> Result<(), LabError> {
        if key.trim().is_empty() {
            return Err(LabError::Validation("setting key is required".into()));
        }
        self.kv
            .set(&format!("{PREFIX}{key}"), value.as_bytes())
            .map_err(|e| LabError::Storage(e.to_string()))
    }

    pub fn delete_setting(&self, key: &str) -> Result<(), LabError> {
        self.kv
            .delete(&format!("{PREFIX}{key}"))
            .map_err(|e| LabError::Storage(e.to_string()))
    }

    pub fn list_settings(&self) -> Result<BTreeMap<String, String>, LabError> {
        let pairs = self
            .kv
            .scan(PREFIX)
            .map_err(|e| LabError::Storage(e.to_string()))?;
        let mut out = BTreeMap::new();
        for (key, value) in pairs {
            let key = key.trim_start_matches(PREFIX).to_string();
            let value =
                String::from_utf8(value).map_err(|e| LabError::Internal(e.to_string()))?;
            out.insert(key, value);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::service;

    #[test]
    fn settings_round_trip() {
        let (svc, _dir) = service();
        assert_eq!(svc.get_setting("company_name").unwrap(), None);

        svc.put_setting("company_name", "Acme Rubber Works").unwrap();
        svc.put_setting("certificate_footer", "QA Lab").unwrap();
        assert_eq!(
            svc.get_setting("company_name").unwrap().as_deref(),
            Some("Acme Rubber Works")
        );

        let all = svc.list_settings().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["certificate_footer"], "QA Lab");

        svc.delete_setting("certificate_footer").unwrap();
        assert_eq!(svc.get_setting("certificate_footer").unwrap(), None);
    }

    #[test]
    fn empty_key_rejected() {
        let (svc, _dir) = service();
        assert!(svc.put_setting("  ", "x").is_err());
    }
}
