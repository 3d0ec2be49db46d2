use labqc_core::{ListParams, ListResult, merge_patch, new_id, now_rfc3339};
use labqc_sql::Value;
use tracing::info;

use crate::model::{CreateProduct, Product, ProductSpecification};
use super::{LabError, LabService};

fn validate_specifications(specs: &[ProductSpecification]) -> Result<(), LabError> {
    let mut seen = Vec::new();
    for row in specs {
        let prop = row.property.trim().to_lowercase();
        if prop.is_empty() {
            return Err(LabError::Validation("specification property is empty".into()));
        }
        if row.specification.trim().is_empty() {
            return Err(LabError::Validation(format!(
                "specification for '{}' is empty",
                row.property
            )));
        }
        if seen.contains(&prop) {
            return Err(LabError::Validation(format!(
                "duplicate specification property '{}'",
                row.property
            )));
        }
        seen.push(prop);
    }
    Ok(())
}

fn product_indexes(p: &Product) -> Vec<(&'static str, Value)> {
    vec![
        ("code", Value::Text(p.code.clone())),
        ("name", Value::Text(p.name.clone())),
        ("active", Value::Integer(p.active as i64)),
        (
            "created_at",
            Value::Text(p.created_at.clone().unwrap_or_default()),
        ),
        (
            "updated_at",
            Value::Text(p.updated_at.clone().unwrap_or_default()),
        ),
    ]
}

impl LabService {
    pub fn create_product(&self, req: CreateProduct) -> Result<Product, LabError> {
        if req.code.trim().is_empty() {
            return Err(LabError::Validation("product code is required".into()));
        }
        if req.name.trim().is_empty() {
            return Err(LabError::Validation("product name is required".into()));
        }
        validate_specifications(&req.specifications)?;

        let now = now_rfc3339();
        let product = Product {
            id: new_id(),
            code: req.code.trim().to_string(),
            name: req.name.trim().to_string(),
            compound: req.compound,
            active: true,
            specifications: req.specifications,
            created_at: Some(now.clone()),
            updated_at: Some(now),
        };

        self.insert_record("products", &product.id, &product, &product_indexes(&product))?;
        info!(code = %product.code, "product created");
        Ok(product)
    }

    pub fn get_product(&self, id: &str) -> Result<Product, LabError> {
        self.get_record("products", id)
    }

    pub fn get_product_by_code(&self, code: &str) -> Result<Product, LabError> {
        let items: Vec<Product> = self.query_records(
            "SELECT data FROM products WHERE code = ?1",
            &[Value::Text(code.to_string())],
        )?;
        items
            .into_iter()
            .next()
            .ok_or_else(|| LabError::NotFound(format!("products/code/{}", code)))
    }

    pub fn list_products(&self, params: &ListParams) -> Result<ListResult<Product>, LabError> {
        let (items, total) =
            self.list_records("products", &[], params.limit, params.offset)?;
        Ok(ListResult { items, total })
    }

    /// Merge-patch update. Identity and audit fields are protected.
    pub fn update_product(
        &self,
        id: &str,
        mut patch: serde_json::Value,
    ) -> Result<Product, LabError> {
        let current = self.get_product(id)?;

        if let Some(obj) = patch.as_object_mut() {
            obj.remove("id");
            obj.remove("createdAt");
        }

        let mut doc = serde_json::to_value(&current)
            .map_err(|e| LabError::Internal(e.to_string()))?;
        merge_patch(&mut doc, &patch);

        let mut updated: Product =
            serde_json::from_value(doc).map_err(|e| LabError::Validation(e.to_string()))?;
        updated.id = current.id.clone();
        updated.created_at = current.created_at.clone();
        updated.updated_at = Some(now_rfc3339());
        validate_specifications(&updated.specifications)?;

        self.update_record("products", id, &updated, &product_indexes(&updated))?;
        Ok(updated)
    }

    pub fn delete_product(&self, id: &str) -> Result<(), LabError> {
        self.delete_record("products", id)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::service;
    use crate::model::{CreateProduct, ProductSpecification};
    use labqc_core::ListParams;

    fn spec(property: &str, specification: &str) -> ProductSpecification {
        ProductSpecification {
            property: property.into(),
            unit: "".into(),
            standard: "".into(),
            specification: specification.into(),
            typical_value: None,
        }
    }

    fn nbr70() -> CreateProduct {
        CreateProduct {
            code: "NBR-70".into(),
            name: "Nitrile 70 Shore A".into(),
            compound: Some("C-118".into()),
            specifications: vec![
                spec("Hardness (Shore A)", "68±7"),
                spec("Specific Gravity", "1.1-1.3"),
            ],
        }
    }

    #[test]
    fn create_get_and_lookup_by_code() {
        let (svc, _dir) = service();
        let p = svc.create_product(nbr70()).unwrap();
        assert!(p.active);

        let by_id = svc.get_product(&p.id).unwrap();
        assert_eq!(by_id.code, "NBR-70");
        let by_code = svc.get_product_by_code("NBR-70").unwrap();
        assert_eq!(by_code.id, p.id);
        assert!(svc.get_product_by_code("EPDM-60").is_err());
    }

    #[test]
    fn duplicate_code_conflicts() {
        let (svc, _dir) = service();
        svc.create_product(nbr70()).unwrap();
        let err = svc.create_product(nbr70()).unwrap_err();
        assert!(matches!(err, super::LabError::Conflict(_)));
    }

    #[test]
    fn duplicate_property_rejected() {
        let (svc, _dir) = service();
        let mut req = nbr70();
        req.specifications.push(spec("hardness (shore a)", "50-90"));
        let err = svc.create_product(req).unwrap_err();
        assert!(matches!(err, super::LabError::Validation(_)));
    }

    #[test]
    fn update_replaces_specification_table() {
        let (svc, _dir) = service();
        let p = svc.create_product(nbr70()).unwrap();
        let updated = svc
            .update_product(
                &p.id,
                serde_json::json!({
                    "specifications": [
                        {"property": "Hardness (Shore A)", "specification": "70±5"}
                    ]
                }),
            )
            .unwrap();
        assert_eq!(updated.specifications.len(), 1);
        assert_eq!(updated.specifications[0].specification, "70±5");
        assert_eq!(updated.created_at, p.created_at);
    }

    #[test]
    fn list_and_delete() {
        let (svc, _dir) = service();
        let p = svc.create_product(nbr70()).unwrap();
        let list = svc.list_products(&ListParams::default()).unwrap();
        assert_eq!(list.total, 1);

        svc.delete_product(&p.id).unwrap();
        assert!(svc.get_product(&p.id).is_err());
    }
}
