#![allow(dead_code)]

use diamond_registry::application::catalog::ModuleCatalog;
use diamond_registry::application::diamond::Diamond;
use diamond_registry::domain::identity::{Identity, Selector};
use diamond_registry::infrastructure::in_memory::InMemoryStateStore;
use diamond_registry::modules::capabilities::CapabilitiesModule;
use diamond_registry::modules::echo::EchoModule;
use diamond_registry::modules::failing::FailingModule;
use diamond_registry::modules::payments::PaymentsModule;
use std::io::Error;
use std::path::Path;

pub const OWNER: u64 = 0xA11CE;
pub const BOOTSTRAP: u64 = 0xB007;
pub const H1: u64 = 1;
pub const H2: u64 = 2;
pub const H3: u64 = 3;
pub const PAYMENTS: u64 = 0x9A7;
pub const CAPABILITIES: u64 = 0xCA9;
pub const HINIT_FAILING: u64 = 0xF417;

pub fn id(n: u64) -> Identity {
    Identity::from_low_u64(n)
}

pub fn sel(signature: &str) -> Selector {
    Selector::from_signature(signature)
}

pub fn catalog() -> ModuleCatalog {
    let mut catalog = ModuleCatalog::new();
    catalog.deploy(id(H1), EchoModule);
    catalog.deploy(id(H2), EchoModule);
    catalog.deploy(id(H3), EchoModule);
    catalog.deploy(id(PAYMENTS), PaymentsModule);
    catalog.deploy(id(CAPABILITIES), CapabilitiesModule);
    catalog.deploy(id(HINIT_FAILING), FailingModule::new("initializer rejected payload"));
    catalog
}

pub async fn open_diamond(store: InMemoryStateStore) -> Diamond {
    Diamond::open(id(OWNER), id(BOOTSTRAP), catalog(), Box::new(store))
        .await
        .expect("Failed to open diamond")
}

/// Handlers other than the bootstrap entry point's, in list order.
pub fn business_handlers(diamond: &Diamond) -> Vec<Identity> {
    diamond
        .handlers()
        .iter()
        .copied()
        .filter(|h| *h != id(BOOTSTRAP))
        .collect()
}

pub fn write_script(path: &Path, rows: &[[&str; 4]]) -> Result<(), Error> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["batch", "action", "handler", "target"])?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}
