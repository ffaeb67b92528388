use serde::{Deserialize, Serialize};

/// `{ "data": { "id": ..., "attributes": ... } }`, the API's single-resource envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: ResourceData<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceData<T> {
    #[serde(default)]
    pub id: Option<String>,
    pub attributes: T,
}

impl<T> Envelope<T> {
    pub fn into_attributes(self) -> T {
        self.data.attributes
    }
}

/// Collection envelope with pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListEnvelope<T> {
    pub data: ListData<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListData<T> {
    pub attributes: ListAttributes<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAttributes<T> {
    pub results: Vec<T>,

    #[serde(default)]
    pub page: Option<u32>,

    #[serde(default)]
    pub limit: Option<u32>,

    #[serde(default)]
    pub total_pages: Option<u32>,

    #[serde(default)]
    pub total_results: Option<u64>,
}

impl<T> ListAttributes<T> {
    /// `true` when the server reported the current page as the last one, or returned nothing.
    pub fn is_last_page(&self) -> bool {
        if self.results.is_empty() {
            return true;
        }

        match (self.page, self.total_pages) {
            (Some(page), Some(total)) => page >= total,
            _ => false,
        }
    }
}
