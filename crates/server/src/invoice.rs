//! PDF invoice rendering.
//!
//! [`render_invoice`] is a pure function from [`InvoiceData`] to PDF bytes.
//! Item rows that do not fit on the first page continue on additional pages;
//! the totals block always follows the last row.

use std::ops::Range;

use chrono::{DateTime, Utc};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use rust_decimal::Decimal;
use thiserror::Error;

use emporium_core::{CurrencyCode, OrderStatus, Price};

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const LEFT: f32 = 20.0;
const ROW_HEIGHT: f32 = 6.0;
/// Baseline of the first table row on page one, below the header blocks.
const FIRST_PAGE_TABLE_TOP: f32 = 180.0;
/// Baseline of the first table row on continuation pages.
const NEXT_PAGE_TABLE_TOP: f32 = 265.0;
const BOTTOM_MARGIN: f32 = 30.0;
/// Rows taken by the totals block (blank line plus four amounts).
const TOTALS_ROWS: usize = 5;
const MAX_NAME_CHARS: usize = 48;

/// Errors from invoice rendering.
#[derive(Debug, Error)]
pub enum InvoiceError {
    #[error("PDF generation failed: {0}")]
    Pdf(String),
}

/// One invoice line.
#[derive(Debug, Clone)]
pub struct InvoiceLine {
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Everything printed on an invoice.
#[derive(Debug, Clone)]
pub struct InvoiceData {
    pub store_name: String,
    pub store_address: Vec<String>,
    pub order_number: String,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub customer_name: String,
    pub customer_email: String,
    /// Shipping address lines; empty when the snapshot could not be opened.
    pub shipping_address: Vec<String>,
    pub items: Vec<InvoiceLine>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub currency: CurrencyCode,
}

/// Which rows go on one page.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PageLayout {
    items: Range<usize>,
    totals: bool,
}

fn rows_between(top: f32) -> usize {
    // Both bounds are small positive constants.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rows = ((top - BOTTOM_MARGIN) / ROW_HEIGHT) as usize;
    rows
}

/// Split `item_count` rows over pages and place the totals block.
fn layout_pages(item_count: usize) -> Vec<PageLayout> {
    let mut pages = Vec::new();
    let mut start = 0;
    let mut capacity = rows_between(FIRST_PAGE_TABLE_TOP);

    loop {
        let end = item_count.min(start + capacity);
        let remaining = capacity - (end - start);
        if end == item_count {
            if remaining >= TOTALS_ROWS {
                pages.push(PageLayout {
                    items: start..end,
                    totals: true,
                });
            } else {
                pages.push(PageLayout {
                    items: start..end,
                    totals: false,
                });
                pages.push(PageLayout {
                    items: end..end,
                    totals: true,
                });
            }
            return pages;
        }
        pages.push(PageLayout {
            items: start..end,
            totals: false,
        });
        start = end;
        capacity = rows_between(NEXT_PAGE_TABLE_TOP);
    }
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Render an invoice to PDF bytes.
///
/// # Errors
///
/// Returns `InvoiceError::Pdf` if the document cannot be assembled.
pub fn render_invoice(data: &InvoiceData) -> Result<Vec<u8>, InvoiceError> {
    let title = format!("Invoice {}", data.order_number);
    let (doc, first_page, first_layer) = PdfDocument::new(&title, PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| InvoiceError::Pdf(e.to_string()))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| InvoiceError::Pdf(e.to_string()))?,
    };

    let pages = layout_pages(data.items.len());
    let page_count = pages.len();

    for (index, page) in pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_ref, layer_ref) = doc.add_page(PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
            doc.get_page(page_ref).get_layer(layer_ref)
        };

        let top = if index == 0 {
            draw_header(&layer, &fonts, data);
            FIRST_PAGE_TABLE_TOP
        } else {
            layer.use_text(
                format!("{title} (continued)"),
                10.0,
                Mm(LEFT),
                Mm(280.0),
                &fonts.regular,
            );
            NEXT_PAGE_TABLE_TOP
        };

        let mut y = draw_table(&layer, &fonts, data, page.items.clone(), top);
        if page.totals {
            y -= ROW_HEIGHT;
            draw_totals(&layer, &fonts, data, y);
        }

        layer.use_text(
            format!("Page {} of {page_count}", index + 1),
            8.0,
            Mm(LEFT),
            Mm(15.0),
            &fonts.regular,
        );
    }

    doc.save_to_bytes()
        .map_err(|e| InvoiceError::Pdf(e.to_string()))
}

fn draw_header(layer: &PdfLayerReference, fonts: &Fonts, data: &InvoiceData) {
    layer.use_text(&data.store_name, 18.0, Mm(LEFT), Mm(275.0), &fonts.bold);
    let mut y = 268.0;
    for line in &data.store_address {
        layer.use_text(line, 9.0, Mm(LEFT), Mm(y), &fonts.regular);
        y -= 4.5;
    }

    layer.use_text("INVOICE", 18.0, Mm(145.0), Mm(275.0), &fonts.bold);
    layer.use_text(
        format!("Order: {}", data.order_number),
        10.0,
        Mm(145.0),
        Mm(267.0),
        &fonts.regular,
    );
    layer.use_text(
        format!("Date: {}", data.order_date.format("%Y-%m-%d")),
        10.0,
        Mm(145.0),
        Mm(261.0),
        &fonts.regular,
    );
    layer.use_text(
        format!("Status: {}", data.status),
        10.0,
        Mm(145.0),
        Mm(255.0),
        &fonts.regular,
    );

    layer.use_text("Bill to", 11.0, Mm(LEFT), Mm(240.0), &fonts.bold);
    layer.use_text(&data.customer_name, 10.0, Mm(LEFT), Mm(234.0), &fonts.regular);
    layer.use_text(&data.customer_email, 10.0, Mm(LEFT), Mm(229.0), &fonts.regular);

    layer.use_text("Ship to", 11.0, Mm(110.0), Mm(240.0), &fonts.bold);
    let mut y = 234.0;
    if data.shipping_address.is_empty() {
        layer.use_text("Address unavailable", 10.0, Mm(110.0), Mm(y), &fonts.regular);
    }
    for line in &data.shipping_address {
        layer.use_text(line, 10.0, Mm(110.0), Mm(y), &fonts.regular);
        y -= 5.0;
    }
}

/// Draw the column headings and `rows`. Returns the baseline below the last row.
fn draw_table(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    data: &InvoiceData,
    rows: Range<usize>,
    top: f32,
) -> f32 {
    let heading = top + ROW_HEIGHT + 2.0;
    layer.use_text("Item", 10.0, Mm(LEFT), Mm(heading), &fonts.bold);
    layer.use_text("Qty", 10.0, Mm(120.0), Mm(heading), &fonts.bold);
    layer.use_text("Unit", 10.0, Mm(140.0), Mm(heading), &fonts.bold);
    layer.use_text("Total", 10.0, Mm(170.0), Mm(heading), &fonts.bold);

    let mut y = top;
    for item in data.items.get(rows).unwrap_or_default() {
        layer.use_text(truncate(&item.name), 10.0, Mm(LEFT), Mm(y), &fonts.regular);
        layer.use_text(item.quantity.to_string(), 10.0, Mm(120.0), Mm(y), &fonts.regular);
        layer.use_text(money(item.unit_price, data.currency), 10.0, Mm(140.0), Mm(y), &fonts.regular);
        layer.use_text(money(item.line_total, data.currency), 10.0, Mm(170.0), Mm(y), &fonts.regular);
        y -= ROW_HEIGHT;
    }
    y
}

fn draw_totals(layer: &PdfLayerReference, fonts: &Fonts, data: &InvoiceData, top: f32) {
    let rows = [
        ("Subtotal", data.subtotal, &fonts.regular),
        ("Shipping", data.shipping, &fonts.regular),
        ("Tax", data.tax, &fonts.regular),
        ("Total", data.total, &fonts.bold),
    ];
    let mut y = top;
    for (label, amount, font) in rows {
        layer.use_text(label, 10.0, Mm(140.0), Mm(y), font);
        layer.use_text(money(amount, data.currency), 10.0, Mm(170.0), Mm(y), font);
        y -= ROW_HEIGHT;
    }
}

fn money(amount: Decimal, currency: CurrencyCode) -> String {
    Price::new(amount, currency).display()
}

fn truncate(name: &str) -> String {
    if name.chars().count() <= MAX_NAME_CHARS {
        return name.to_string();
    }
    let mut short: String = name.chars().take(MAX_NAME_CHARS - 3).collect();
    short.push_str("...");
    short
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn invoice(item_count: usize) -> InvoiceData {
        let items = (0..item_count)
            .map(|i| InvoiceLine {
                name: format!("Product {i}"),
                quantity: 1,
                unit_price: Decimal::new(1000, 2),
                line_total: Decimal::new(1000, 2),
            })
            .collect();
        InvoiceData {
            store_name: "Emporium".to_string(),
            store_address: vec!["1 Market St".to_string(), "Springfield".to_string()],
            order_number: "ORD-20260301-7".to_string(),
            order_date: Utc::now(),
            status: OrderStatus::Paid,
            customer_name: "Ada Lovelace".to_string(),
            customer_email: "ada@example.com".to_string(),
            shipping_address: vec!["Ada Lovelace".to_string(), "12 Analytical Row".to_string()],
            items,
            subtotal: Decimal::new(3000, 2),
            shipping: Decimal::new(500, 2),
            tax: Decimal::ZERO,
            total: Decimal::new(3500, 2),
            currency: CurrencyCode::USD,
        }
    }

    #[test]
    fn test_renders_pdf_document() {
        let bytes = render_invoice(&invoice(3)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_renders_long_order() {
        let bytes = render_invoice(&invoice(120)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_short_order_fits_one_page() {
        let pages = layout_pages(3);
        assert_eq!(
            pages,
            vec![PageLayout {
                items: 0..3,
                totals: true
            }]
        );
    }

    #[test]
    fn test_long_order_continues_on_more_pages() {
        let pages = layout_pages(120);
        assert!(pages.len() > 2);
        assert_eq!(pages.first().map(|p| p.items.start), Some(0));
        assert_eq!(pages.last().map(|p| p.items.end), Some(120));
        assert!(pages.last().is_some_and(|p| p.totals));
        assert_eq!(pages.iter().filter(|p| p.totals).count(), 1);
        for pair in pages.windows(2) {
            if let [a, b] = pair {
                assert_eq!(a.items.end, b.items.start);
            }
        }
    }

    #[test]
    fn test_totals_move_to_new_page_when_full() {
        let first_page_rows = rows_between(FIRST_PAGE_TABLE_TOP);
        let pages = layout_pages(first_page_rows);
        assert_eq!(pages.len(), 2);
        assert!(!pages.first().is_some_and(|p| p.totals));
        assert_eq!(pages.last().map(|p| p.items.clone()), Some(first_page_rows..first_page_rows));
    }

    #[test]
    fn test_truncate_long_names() {
        let name = "x".repeat(80);
        assert_eq!(truncate(&name).chars().count(), MAX_NAME_CHARS);
        assert_eq!(truncate("Mug"), "Mug");
    }
}
