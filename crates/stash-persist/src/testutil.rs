use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use stash_catalog::InMemoryCatalog;
use stash_crypto::Codec;
use stash_store::InMemoryBlobStore;
use stash_types::Kind;

use crate::manager::PersistenceManager;
use crate::record::Persistable;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    pub weights: Vec<f64>,
    pub params: BTreeMap<String, i64>,
}

impl Model {
    pub fn new(name: &str, weights: &[f64]) -> Self {
        Self {
            name: name.into(),
            weights: weights.to_vec(),
            params: BTreeMap::from([("depth".to_string(), 3)]),
        }
    }
}

impl Persistable for Model {
    const KIND: Kind = Kind::Estimator;
    const TYPE_NAME: &'static str = "model";
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Text(pub String);

impl Persistable for Text {
    const KIND: Kind = Kind::DataSet;
    const TYPE_NAME: &'static str = "text";
}

pub struct Fixture {
    pub store: Arc<InMemoryBlobStore>,
    pub catalog: Arc<InMemoryCatalog>,
    pub manager: PersistenceManager,
}

pub fn fixture() -> Fixture {
    fixture_with(Codec::default())
}

pub fn fixture_with(codec: Codec) -> Fixture {
    let store = Arc::new(InMemoryBlobStore::new());
    let catalog = Arc::new(InMemoryCatalog::new());
    let manager = PersistenceManager::new(store.clone(), catalog.clone(), codec);
    Fixture {
        store,
        catalog,
        manager,
    }
}
