pub mod cli;
pub mod cli_adapter;
pub mod config;
pub mod identity;
pub mod transport;
pub mod types;
pub mod view;
pub mod widget;

use crate::cli::Args;
use crate::config::{Config, Variant};
use crate::identity::{FileStore, IdentityProvider, StoredIdentity};
use crate::transport::HttpBackend;
use crate::view::TerminalView;
use crate::widget::ChatWidget;
use anyhow::{Context, Result};
use std::sync::{Arc, Mutex};

/// Merges command-line overrides into the loaded (or default) config.
pub fn resolve_config(args: &Args) -> Result<Config> {
    let mut cfg = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(variant) = &args.variant {
        cfg.widget.variant = variant.parse::<Variant>()?;
    }
    if let Some(endpoint) = &args.endpoint {
        cfg.backend.endpoint = Some(endpoint.clone());
    }
    if let Some(store) = &args.store {
        cfg.storage.path = store.clone();
    }
    cfg.validate()?;
    Ok(cfg)
}

pub async fn run(args: Args) -> Result<()> {
    let cfg = resolve_config(&args)?;
    let settings = cfg.settings();
    let endpoint = cfg.endpoint()?;

    log::info!("variant: {}", settings.variant);
    log::info!("endpoint: {endpoint}");

    let identity: Option<Arc<dyn IdentityProvider>> = match settings.variant {
        Variant::Relay => {
            let store = FileStore::open(&cfg.storage.path).with_context(|| {
                format!("failed to open storage {}", cfg.storage.path.display())
            })?;
            log::info!("conversation storage: {}", store.path().display());
            let provider: Arc<dyn IdentityProvider> = Arc::new(StoredIdentity::new(store));
            Some(provider)
        }
        Variant::Direct => None,
    };

    let view = Arc::new(Mutex::new(TerminalView::stdout()));
    let backend = Arc::new(HttpBackend::new(endpoint));
    let widget = ChatWidget::new(settings, view, backend, identity)?;

    widget.mount();
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    cli_adapter::run(&widget, stdin).await
}
