//! The REST accessor: `load_entity`/`load_range`, with the type-model
//! version header injected on every call (spec §4.I).

use anyhow::Result;

use crate::client::Client;
use crate::model::registry::TypeModel;
use crate::wire::Instance;

pub(crate) struct Rest<'a> {
    client: &'a Client,
    access_token: &'a str,
}

impl<'a> Rest<'a> {
    pub(crate) fn new(client: &'a Client, access_token: &'a str) -> Self {
        Self { client, access_token }
    }

    /// Loads a standalone (element-id-addressed) entity.
    pub(crate) async fn load_entity(&self, type_model: &TypeModel, id: &str) -> Result<Instance> {
        let path = format!("{}/{}/{}", type_model.app, type_model.path_name(), id);
        self.client
            .get(&path, type_model.version, Some(self.access_token))
            .await
    }

    /// Loads a list-typed (tuple-id-addressed) entity.
    pub(crate) async fn load_entity_tuple(
        &self,
        type_model: &TypeModel,
        list_id: &str,
        element_id: &str,
    ) -> Result<Instance> {
        let path = format!(
            "{}/{}/{list_id}/{element_id}",
            type_model.app,
            type_model.path_name(),
        );
        self.client
            .get(&path, type_model.version, Some(self.access_token))
            .await
    }

    /// Range query over a list-typed entity.
    pub(crate) async fn load_range(
        &self,
        type_model: &TypeModel,
        list_id: &str,
        start: &str,
        count: usize,
        reverse: bool,
    ) -> Result<Vec<Instance>> {
        let path = format!("{}/{}/{list_id}", type_model.app, type_model.path_name());
        let query = [
            ("start", start.to_owned()),
            ("count", count.to_string()),
            ("reverse", reverse.to_string()),
        ];
        self.client
            .get_with_query(&path, &query, type_model.version, Some(self.access_token))
            .await
    }
}
