//! Order history and invoice route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use emporium_core::OrderId;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{Order, OrderDetail, Page, PageParams};
use crate::services::orders::{Invoice, OrderService};
use crate::state::AppState;

/// How the browser should present a PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Attachment,
    Inline,
}

impl Disposition {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Attachment => "attachment",
            Self::Inline => "inline",
        }
    }
}

/// Build a PDF response for an invoice.
pub fn pdf_response(invoice: Invoice, disposition: Disposition) -> Response {
    let content_disposition = format!(
        "{}; filename=\"{}\"",
        disposition.as_str(),
        invoice.filename
    );

    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, content_disposition),
            (header::CACHE_CONTROL, "private, no-store".to_string()),
        ],
        invoice.pdf,
    )
        .into_response()
}

fn orders(state: &AppState) -> OrderService<'_> {
    OrderService::new(state.pool(), state.sealer(), state.stripe())
}

/// The user's orders, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Order>>> {
    Ok(Json(
        orders(&state).list_for_user(user.id, params.into()).await?,
    ))
}

/// An order with its items (owner or admin).
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    Ok(Json(orders(&state).detail(&user, id).await?))
}

/// Cancel an own order, refunding the charge.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(orders(&state).cancel(&user, id).await?))
}

/// Download the PDF invoice (owner or admin).
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn download_invoice(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Response> {
    let invoice = orders(&state)
        .invoice(&user, id, &state.config().store)
        .await?;
    Ok(pdf_response(invoice, Disposition::Attachment))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;

    use super::super::test_support::{get, send};
    use super::*;

    #[test]
    fn test_pdf_response_headers() {
        let invoice = Invoice {
            filename: "invoice-ORD-20260101-1.pdf".to_string(),
            pdf: b"%PDF-1.3".to_vec(),
        };

        let response = pdf_response(invoice.clone(), Disposition::Attachment);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/pdf"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"invoice-ORD-20260101-1.pdf\""
        );

        let response = pdf_response(invoice, Disposition::Inline);
        assert!(
            response
                .headers()
                .get(header::CONTENT_DISPOSITION)
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("inline;")
        );
    }

    #[tokio::test]
    async fn test_orders_require_auth() {
        for uri in ["/api/orders", "/api/orders/1", "/api/invoices/1/download"] {
            let response = send(get(uri)).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }
}
