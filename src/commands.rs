use crate::{emit_success, OutputMode};
use itemstore::config::{self, ItemstoreConfig, Settings};
use itemstore::ui::{self, Icons};
use itemstore::{ItemFields, ItemId, ItemService, NewItem};
use std::path::Path;

pub fn run_add(
    output_mode: OutputMode,
    service: &ItemService,
    name: String,
    price: f64,
    id: Option<String>,
) -> anyhow::Result<()> {
    let mut new_item = NewItem::new(name, price);
    if let Some(id) = id {
        new_item = new_item.with_id(id);
    }

    let item = service.create(new_item)?;
    if output_mode.is_human() {
        ui::item_line(Icons::NEW, &item);
        ui::success(&format!("Item added ({} backend)", service.backend()));
    } else {
        emit_success(output_mode, "add", serde_json::json!({ "item": item }))?;
    }
    Ok(())
}

pub fn run_list(output_mode: OutputMode, service: &ItemService) -> anyhow::Result<()> {
    let items = service.list()?;
    if output_mode.is_human() {
        if items.is_empty() {
            println!("{} No items found.", Icons::EMPTY);
        } else {
            println!("{}", ui::items_table(&items));
            println!("{}", ui::dim(&format!("{} item(s)", items.len())));
        }
    } else {
        emit_success(output_mode, "list", serde_json::json!({ "items": items }))?;
    }
    Ok(())
}

pub fn run_show(output_mode: OutputMode, service: &ItemService, id: &str) -> anyhow::Result<()> {
    let item = service.get(&ItemId::from(id))?;
    if output_mode.is_human() {
        ui::item_line(Icons::PACKAGE, &item);
    } else {
        emit_success(output_mode, "show", serde_json::json!({ "item": item }))?;
    }
    Ok(())
}

pub fn run_edit(
    output_mode: OutputMode,
    service: &ItemService,
    id: &str,
    name: String,
    price: f64,
) -> anyhow::Result<()> {
    let item = service.update(&ItemId::from(id), ItemFields::new(name, price))?;
    if output_mode.is_human() {
        ui::item_line(Icons::MOD, &item);
        ui::success("Item updated");
    } else {
        emit_success(output_mode, "edit", serde_json::json!({ "item": item }))?;
    }
    Ok(())
}

pub fn run_remove(output_mode: OutputMode, service: &ItemService, id: &str) -> anyhow::Result<()> {
    let item = service.delete(&ItemId::from(id))?;
    if output_mode.is_human() {
        ui::item_line(Icons::DEL, &item);
        ui::success("Item removed");
    } else {
        emit_success(output_mode, "remove", serde_json::json!({ "item": item }))?;
    }
    Ok(())
}

pub fn run_init(output_mode: OutputMode, path: &Path, force: bool) -> anyhow::Result<()> {
    let defaults = Settings::default();
    let file = ItemstoreConfig {
        backend: Some(defaults.backend),
        data_file: Some(defaults.data_file.display().to_string()),
        database_url: Some(defaults.database_url.clone()),
        tls_insecure: Some(false),
        lock_documents: Some(false),
    };

    config::ensure_parent_dir(path)?;
    config::write_config(path, &file, force)?;

    if output_mode.is_human() {
        ui::header("Itemstore initialized");
        ui::info("Config", &path.display().to_string());
        ui::success("Edit the file to pick a backend");
    } else {
        emit_success(
            output_mode,
            "init",
            serde_json::json!({ "config": path.display().to_string() }),
        )?;
    }
    Ok(())
}

pub fn run_settings(output_mode: OutputMode, settings: &Settings) -> anyhow::Result<()> {
    if output_mode.is_human() {
        ui::section("Settings");
        println!("{}", ui::settings_table(settings));
        if settings.tls_insecure {
            ui::warn("tls_insecure is on: server certificates are not validated");
        }
    } else {
        emit_success(
            output_mode,
            "settings",
            serde_json::json!({
                "backend": settings.backend,
                "data_file": settings.data_file,
                "database_url": settings.database_url,
                "tls_insecure": settings.tls_insecure,
                "lock_documents": settings.lock_documents,
            }),
        )?;
    }
    Ok(())
}
