//! Invoice HTTP endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::Invoice;
use serde::Serialize;

use crate::error::ApiError;
use crate::repository::InvoiceRepository;
use crate::service::InvoiceService;
use crate::storage::FileStorage;

/// Shared application state accessible from all handlers.
pub struct AppState<R, S> {
    pub invoices: InvoiceService<R>,
    pub storage: S,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
    pub id: String,
    pub order_id: String,
    pub pdf_path: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Invoice> for InvoiceResponse {
    fn from(invoice: &Invoice) -> Self {
        Self {
            id: invoice.id().to_string(),
            order_id: invoice.order_id().to_string(),
            pdf_path: invoice.pdf_path().to_string(),
            sent_at: invoice.sent_at(),
            created_at: invoice.created_at(),
            updated_at: invoice.updated_at(),
        }
    }
}

// -- Handlers --

/// POST /invoices — upload an invoice PDF for an order.
///
/// Multipart form with an `orderId` field and a `file` part that must be
/// a PDF. Fields outside that whitelist are rejected.
#[tracing::instrument(skip(state, multipart))]
pub async fn upload<R, S>(
    State(state): State<Arc<AppState<R, S>>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<InvoiceResponse>), ApiError>
where
    R: InvoiceRepository + 'static,
    S: FileStorage + 'static,
{
    let mut order_id: Option<String> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("orderId") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid orderId field: {e}")))?;
                order_id = Some(value);
            }
            Some("file") => {
                if field.content_type() != Some("application/pdf") {
                    return Err(ApiError::BadRequest("Only PDF files are allowed".to_string()));
                }
                let filename = field.file_name().unwrap_or("invoice.pdf").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid file field: {e}")))?;
                file = Some((filename, bytes.to_vec()));
            }
            other => {
                let name = other.unwrap_or("<unnamed>");
                return Err(ApiError::BadRequest(format!("Unexpected field: {name}")));
            }
        }
    }

    let order_id =
        order_id.ok_or_else(|| ApiError::BadRequest("orderId is required".to_string()))?;
    let (filename, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("PDF file is required".to_string()))?;

    let pdf_path = state.storage.store(&filename, &bytes).await?;
    let invoice = state.invoices.upload_invoice(&order_id, &pdf_path).await?;

    Ok((StatusCode::CREATED, Json(InvoiceResponse::from(&invoice))))
}

/// GET /invoices/{orderId} — load the invoice for an order.
#[tracing::instrument(skip(state))]
pub async fn get<R, S>(
    State(state): State<Arc<AppState<R, S>>>,
    Path(order_id): Path<String>,
) -> Result<Json<InvoiceResponse>, ApiError>
where
    R: InvoiceRepository + 'static,
    S: FileStorage + 'static,
{
    let invoice = state.invoices.get_invoice(&order_id).await?;
    Ok(Json(InvoiceResponse::from(&invoice)))
}
