use std::io::Read;
use std::sync::LazyLock;

use rusqlite::Connection;
use scraper::{ElementRef, Html, Selector};
use tracing::info;

use crate::db;
use crate::error::EtlError;

static PRODUCT_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.product").unwrap());
static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static INVENTORY_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".inventory").unwrap());
static COST_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".cost").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    /// Last path segment of the container's link target.
    pub id: String,
    pub description: String,
    pub stock: i64,
    pub price: f64,
    pub currency: char,
}

/// Extract every `div.product` container from the catalog HTML and insert
/// one Product per container, in document order, committed as each lands.
/// A container missing any expected child aborts the remaining containers;
/// records inserted before it stay committed.
pub fn load_catalog(conn: &Connection, mut input: impl Read) -> Result<usize, EtlError> {
    let mut html = String::new();
    input.read_to_string(&mut html)?;
    let doc = Html::parse_document(&html);

    let mut count = 0;
    for (index, container) in doc.select(&PRODUCT_SEL).enumerate() {
        let product = extract_product(index, container)?;
        db::insert_product(conn, &product)?;
        count += 1;
    }
    info!("extracted {} products from catalog", count);
    Ok(count)
}

/// First-matching-child queries over one product container. Absence of a
/// child is a named structure error, not an index fault.
fn extract_product(index: usize, container: ElementRef<'_>) -> Result<Product, EtlError> {
    let link = container
        .select(&LINK_SEL)
        .next()
        .ok_or_else(|| EtlError::structure(index, "no <a> link node"))?;
    let href = link
        .value()
        .attr("href")
        .ok_or_else(|| EtlError::structure(index, "link node has no href"))?;
    let id = href.rsplit('/').next().unwrap_or(href).to_string();
    let description = text_of(link);

    let inventory = container
        .select(&INVENTORY_SEL)
        .next()
        .ok_or_else(|| EtlError::structure(index, "no inventory node"))?;
    let inventory_text = text_of(inventory);
    let stock_token = inventory_text
        .split_whitespace()
        .next()
        .ok_or_else(|| EtlError::structure(index, "inventory node is empty"))?;
    let stock: i64 = stock_token.parse().map_err(|_| {
        EtlError::structure(index, format!("inventory count {stock_token:?} is not an integer"))
    })?;

    let cost = container
        .select(&COST_SEL)
        .next()
        .ok_or_else(|| EtlError::structure(index, "no cost node"))?;
    let cost_text = text_of(cost);
    let mut chars = cost_text.chars();
    let currency = chars
        .next()
        .ok_or_else(|| EtlError::structure(index, "cost node is empty"))?;
    let price: f64 = chars.as_str().parse().map_err(|_| {
        EtlError::structure(index, format!("cost {cost_text:?} has no decimal price"))
    })?;

    Ok(Product {
        id,
        description,
        stock,
        price,
        currency,
    })
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

// ── Tests ──
