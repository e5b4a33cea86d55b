use serde::{Deserialize, Serialize};

/// One page of a list endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormOwner {
    #[serde(rename = "type", default)]
    pub owner_type: Option<String>,
    #[serde(default)]
    pub id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormUnit {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// A submitted job form. Only the parts the poller reads are modelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSubmission {
    pub id: i64,
    #[serde(default)]
    pub owners: Vec<FormOwner>,
    #[serde(default)]
    pub units: Vec<FormUnit>,
}

impl FormSubmission {
    /// First owner of type `Job`.
    pub fn job_id(&self) -> Option<i64> {
        self.owners
            .iter()
            .find(|o| o.owner_type.as_deref() == Some("Job"))
            .and_then(|o| o.id)
    }

    /// Value of the first unit whose name mentions "materials used", if it is
    /// non-blank text.
    pub fn materials_text(&self) -> Option<&str> {
        self.units
            .iter()
            .find(|u| {
                u.name
                    .as_deref()
                    .is_some_and(|n| n.to_lowercase().contains("materials used"))
            })
            .and_then(|u| u.value.as_str())
            .filter(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct InvoiceRef {
    id: Option<i64>,
}

/// The bits of a job record needed to find its invoice.
#[derive(Debug, Clone, Deserialize)]
pub struct JobRecord {
    #[serde(default)]
    invoices: Vec<InvoiceRef>,
    #[serde(default)]
    invoice: Option<InvoiceRef>,
}

impl JobRecord {
    /// First listed invoice, else the single `invoice` reference.
    pub fn invoice_id(&self) -> Option<i64> {
        match self.invoices.first() {
            Some(first) => first.id,
            None => self.invoice.as_ref().and_then(|i| i.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_fields() {
        let json = r#"{
            "id": 77,
            "owners": [{"type": "Customer", "id": 5}, {"type": "Job", "id": 1234}],
            "units": [
                {"name": "Technician notes", "value": "all good"},
                {"name": "Materials Used (list)", "value": "3 x wye\n6in flex"},
                {"name": "Materials used again", "value": "ignored"}
            ]
        }"#;
        let form: FormSubmission = serde_json::from_str(json).unwrap();

        assert_eq!(form.job_id(), Some(1234));
        assert_eq!(form.materials_text(), Some("3 x wye\n6in flex"));
    }

    #[test]
    fn test_submission_without_job_or_materials() {
        let json = r#"{"id": 1, "owners": [{"type": "Customer", "id": 5}],
            "units": [{"name": "Materials used", "value": "   "}, {"name": null, "value": 3}]}"#;
        let form: FormSubmission = serde_json::from_str(json).unwrap();

        assert_eq!(form.job_id(), None);
        assert_eq!(form.materials_text(), None);

        let bare: FormSubmission = serde_json::from_str(r#"{"id": 2}"#).unwrap();
        assert!(bare.owners.is_empty());
        assert_eq!(bare.materials_text(), None);
    }

    #[test]
    fn test_job_invoice_id() {
        let listed: JobRecord =
            serde_json::from_str(r#"{"invoices": [{"id": 900}, {"id": 901}], "invoice": {"id": 1}}"#)
                .unwrap();
        assert_eq!(listed.invoice_id(), Some(900));

        let single: JobRecord = serde_json::from_str(r#"{"invoice": {"id": 55}}"#).unwrap();
        assert_eq!(single.invoice_id(), Some(55));

        let none: JobRecord = serde_json::from_str(r#"{"id": 3}"#).unwrap();
        assert_eq!(none.invoice_id(), None);
    }

    #[test]
    fn test_page_defaults() {
        let page: Page<FormSubmission> = serde_json::from_str(r#"{"page": 1}"#).unwrap();
        assert!(page.data.is_empty());
        assert!(!page.has_more);
    }
}
