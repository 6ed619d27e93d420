use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};

use crate::error::ApiError;
use crate::models::InvoiceDetail;

// Letter-size page, in millimetres.
const PAGE_WIDTH: f32 = 215.9;
const PAGE_HEIGHT: f32 = 279.4;
const MARGIN: f32 = 15.0;
const BOTTOM_MARGIN: f32 = 30.0;

// Table column x positions.
const X_DESC: f32 = MARGIN;
const X_QTY: f32 = 115.0;
const X_UNIT: f32 = 145.0;
const X_AMOUNT: f32 = 175.0;

/// Render a hydrated invoice to PDF bytes. Pure transform, no store
/// access; long item lists flow onto additional pages.
pub fn render_invoice(detail: &InvoiceDetail) -> Result<Vec<u8>, ApiError> {
    let invoice = &detail.invoice;
    let client = &detail.client;

    let (doc, page1, layer1) = PdfDocument::new(
        format!("Invoice {}", invoice.invoice_number),
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Layer 1",
    );
    let mut layer = doc.get_page(page1).get_layer(layer1);

    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ApiError::Pdf(e.to_string()))?;
    let font_bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ApiError::Pdf(e.to_string()))?;

    let mut y: f32 = PAGE_HEIGHT - 20.0;

    // Title
    push_line(
        &layer,
        &font_bold,
        &format!("INVOICE #{}", invoice.invoice_number),
        20.0,
        MARGIN,
        y,
    );
    y -= 14.0;

    // Bill To block
    push_line(&layer, &font_bold, "Bill To:", 11.0, MARGIN, y);
    y -= 6.0;
    push_line(&layer, &font, &client.name, 10.0, MARGIN, y);
    y -= 5.0;
    push_line(&layer, &font, &client.email, 10.0, MARGIN, y);
    y -= 5.0;
    if let Some(address) = &client.address {
        push_line(&layer, &font, address, 10.0, MARGIN, y);
        y -= 5.0;
    }
    if let Some(phone) = &client.phone {
        push_line(&layer, &font, phone, 10.0, MARGIN, y);
        y -= 5.0;
    }

    // Dates and status
    y -= 6.0;
    push_line(
        &layer,
        &font,
        &format!("Issue Date: {}", invoice.issue_date.format("%Y-%m-%d")),
        10.0,
        MARGIN,
        y,
    );
    y -= 5.0;
    push_line(
        &layer,
        &font,
        &format!("Due Date: {}", invoice.due_date.format("%Y-%m-%d")),
        10.0,
        MARGIN,
        y,
    );
    y -= 5.0;
    push_line(
        &layer,
        &font,
        &format!("Status: {}", invoice.status.as_str().to_uppercase()),
        10.0,
        MARGIN,
        y,
    );

    // Items table
    y -= 10.0;
    table_header(&layer, &font_bold, &mut y);

    for item in &detail.items {
        if y < BOTTOM_MARGIN {
            let (page, next_layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            layer = doc.get_page(page).get_layer(next_layer);
            y = PAGE_HEIGHT - 20.0;
            table_header(&layer, &font_bold, &mut y);
        }

        push_line(&layer, &font, &item.description, 10.0, X_DESC, y);
        push_line(&layer, &font, &format!("{}", item.quantity), 10.0, X_QTY, y);
        push_line(&layer, &font, &fmt_money(item.unit_price), 10.0, X_UNIT, y);
        push_line(&layer, &font, &fmt_money(item.amount), 10.0, X_AMOUNT, y);
        y -= 6.0;
    }

    y -= 2.0;
    divider(&layer, y);
    y -= 7.0;

    // Summary rows; tax amount is the difference so the sheet always
    // reconciles with the stored totals.
    if y < BOTTOM_MARGIN {
        let (page, next_layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        layer = doc.get_page(page).get_layer(next_layer);
        y = PAGE_HEIGHT - 20.0;
    }
    push_line(&layer, &font, "Subtotal:", 10.0, X_UNIT, y);
    push_line(&layer, &font, &fmt_money(invoice.subtotal), 10.0, X_AMOUNT, y);
    y -= 6.0;
    push_line(
        &layer,
        &font,
        &format!("Tax ({}%):", invoice.tax_rate),
        10.0,
        X_UNIT,
        y,
    );
    push_line(
        &layer,
        &font,
        &fmt_money(invoice.total - invoice.subtotal),
        10.0,
        X_AMOUNT,
        y,
    );
    y -= 7.0;
    push_line(&layer, &font_bold, "Total:", 12.0, X_UNIT, y);
    push_line(&layer, &font_bold, &fmt_money(invoice.total), 12.0, X_AMOUNT, y);

    // Notes block, only when there is something to say
    if let Some(notes) = &invoice.notes {
        if !notes.trim().is_empty() {
            y -= 14.0;
            push_line(&layer, &font_bold, "Notes:", 11.0, MARGIN, y);
            y -= 6.0;
            for line in notes.lines() {
                if y < 20.0 {
                    break;
                }
                push_line(&layer, &font, line, 10.0, MARGIN, y);
                y -= 5.0;
            }
        }
    }

    doc.save_to_bytes().map_err(|e| ApiError::Pdf(e.to_string()))
}

fn table_header(layer: &PdfLayerReference, font_bold: &IndirectFontRef, y: &mut f32) {
    push_line(layer, font_bold, "Description", 10.0, X_DESC, *y);
    push_line(layer, font_bold, "Quantity", 10.0, X_QTY, *y);
    push_line(layer, font_bold, "Unit Price", 10.0, X_UNIT, *y);
    push_line(layer, font_bold, "Amount", 10.0, X_AMOUNT, *y);
    *y -= 3.5;
    divider(layer, *y);
    *y -= 6.0;
}

fn divider(layer: &PdfLayerReference, y: f32) {
    layer.add_line(printpdf::Line {
        points: vec![
            (printpdf::Point::new(Mm(MARGIN), Mm(y)), false),
            (printpdf::Point::new(Mm(PAGE_WIDTH - MARGIN), Mm(y)), false),
        ],
        is_closed: false,
    });
}

fn push_line(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    text: &str,
    font_size: f32,
    x: f32,
    y: f32,
) {
    layer.use_text(text, font_size, Mm(x), Mm(y), font);
}

fn fmt_money(value: f64) -> String {
    format!("${value:.2}")
}
