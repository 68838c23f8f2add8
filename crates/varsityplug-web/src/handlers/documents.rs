//! Document uploads, edits, deletion and download.
//!
//! Files live under the media root as
//! `documents/{user_id}/{document_type}/{uuid}.{ext}`; the database keeps the
//! relative path.

use crate::auth::CurrentUser;
use crate::error::{PageError, PageResult};
use crate::state::{AppState, SharedState};
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use std::path::PathBuf;
use varsityplug_admissions::fees::{on_time_fee, PaymentBreakdown};
use varsityplug_admissions::subscription::terms;
use varsityplug_common::DocumentType;
use varsityplug_db::{Document, FlashLevel, NewDocument};
use varsityplug_security::validate_upload;

#[derive(Debug, Default)]
struct UploadFields {
    document_type: Option<String>,
    university_id: Option<String>,
    /// (original file name, contents); absent when no file was chosen.
    file: Option<(String, Bytes)>,
}

async fn read_fields(mut multipart: Multipart) -> Result<UploadFields, MultipartError> {
    let mut fields = UploadFields::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "document_type" => fields.document_type = Some(field.text().await?),
            "university_id" => fields.university_id = Some(field.text().await?),
            "file" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let data = field.bytes().await?;
                if !file_name.is_empty() || !data.is_empty() {
                    fields.file = Some((file_name, data));
                }
            }
            _ => {}
        }
    }
    Ok(fields)
}

fn parse_document_type(raw: Option<&str>) -> Option<DocumentType> {
    raw.map(str::trim).filter(|s| !s.is_empty())?.parse().ok()
}

/// Validate and write an uploaded file; returns its path relative to the media root.
async fn store_file(
    state: &AppState,
    user_id: i64,
    document_type: DocumentType,
    file_name: &str,
    data: &[u8],
) -> Result<String, String> {
    let ext = validate_upload(file_name, data.len()).map_err(|e| e.to_string())?;
    let relative = format!(
        "documents/{}/{}/{}.{}",
        user_id,
        document_type.as_str(),
        uuid::Uuid::new_v4(),
        ext
    );
    let full = state.config.server.media_root.join(&relative);
    if let Some(dir) = full.parent() {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            tracing::error!("Could not create media directory {}: {}", dir.display(), e);
            "Could not save the file. Please try again.".to_string()
        })?;
    }
    tokio::fs::write(&full, data).await.map_err(|e| {
        tracing::error!("Could not write upload {}: {}", full.display(), e);
        "Could not save the file. Please try again.".to_string()
    })?;
    Ok(relative)
}

async fn remove_file(state: &AppState, relative: &str) {
    let full = state.config.server.media_root.join(relative);
    if let Err(e) = tokio::fs::remove_file(&full).await {
        tracing::warn!("Could not remove {}: {}", full.display(), e);
    }
}

/// Open a pending payment for a proof of payment.
async fn record_payment(state: &AppState, user: &CurrentUser, doc: &Document) -> PageResult<()> {
    let amount = match (doc.document_type, doc.university_id) {
        (DocumentType::SubscriptionPayment, _) => {
            let profile = state.users().profile(user.id()).await?;
            terms(profile.subscription_package).price
        }
        (DocumentType::PaymentProof, Some(university_id)) => match state.universities().find(university_id).await? {
            Some(university) => on_time_fee(&university.application_fee),
            None => 0,
        },
        // A proof without a university covers the whole breakdown.
        (DocumentType::PaymentProof, None) => {
            let profile = state.users().profile(user.id()).await?;
            let selected = state.selections().list(user.id()).await?;
            PaymentBreakdown::build(
                selected.iter().map(|u| (u.id, u.name.as_str(), u.application_fee.as_str())),
                terms(profile.subscription_package).price,
            )
            .total
        }
        _ => return Ok(()),
    };
    let payment = state
        .payments()
        .create(user.id(), doc.university_id, i64::from(amount), Some(doc.id))
        .await?;
    tracing::info!(user_id = user.id(), payment_id = payment.id, amount, "Recorded pending payment");
    Ok(())
}

pub async fn upload_document(
    State(state): State<SharedState>,
    user: CurrentUser,
    multipart: Multipart,
) -> PageResult<Redirect> {
    let back = Redirect::to("/dashboard/student");
    let fields = match read_fields(multipart).await {
        Ok(fields) => fields,
        Err(e) => {
            tracing::warn!(user_id = user.id(), "Unreadable upload: {}", e);
            user.flash(&state, FlashLevel::Error, "The upload could not be read. Files must be 5MB or smaller.")
                .await;
            return Ok(back);
        }
    };

    let Some(document_type) = parse_document_type(fields.document_type.as_deref()) else {
        user.flash(&state, FlashLevel::Error, "Error in document_type: Select a valid choice.").await;
        return Ok(back);
    };
    let Some((file_name, data)) = fields.file else {
        user.flash(&state, FlashLevel::Error, "Error in file: This field is required.").await;
        return Ok(back);
    };

    let university = match fields.university_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) if document_type == DocumentType::PaymentProof => {
            let found = match raw.parse::<i64>() {
                Ok(id) => state.universities().find(id).await?,
                Err(_) => None,
            };
            match found {
                Some(university) => Some(university),
                None => {
                    tracing::warn!(user_id = user.id(), "Proof of payment for unknown university {:?}", raw);
                    user.flash(&state, FlashLevel::Error, "Invalid university specified for payment proof.")
                        .await;
                    return Ok(back);
                }
            }
        }
        _ => None,
    };

    let file_path = match store_file(&state, user.id(), document_type, &file_name, &data).await {
        Ok(path) => path,
        Err(message) => {
            user.flash(&state, FlashLevel::Error, format!("Error in file: {message}")).await;
            return Ok(back);
        }
    };

    let doc = state
        .documents()
        .create(&NewDocument {
            user_id: user.id(),
            document_type,
            file_path,
            original_name: file_name,
            university_id: university.as_ref().map(|u| u.id),
        })
        .await?;
    tracing::info!(user_id = user.id(), document_id = doc.id, "Uploaded {}", document_type);

    if document_type.is_payment() {
        record_payment(&state, &user, &doc).await?;
    }

    let message = match &university {
        Some(u) => format!("Proof of payment for {} uploaded successfully!", u.name),
        None => format!("{} uploaded successfully!", document_type.label()),
    };
    user.flash(&state, FlashLevel::Success, message).await;
    Ok(back)
}

/// A document owned by `user`; anyone else's is reported as missing.
async fn own_document(state: &AppState, user: &CurrentUser, id: i64) -> PageResult<Document> {
    match state.documents().find(id).await? {
        Some(doc) if doc.user_id == user.id() => Ok(doc),
        _ => Err(PageError::NotFound(format!("document {id}"))),
    }
}

pub async fn edit_document(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> PageResult<Redirect> {
    let back = Redirect::to("/dashboard/student");
    let doc = own_document(&state, &user, id).await?;
    let fields = match read_fields(multipart).await {
        Ok(fields) => fields,
        Err(e) => {
            tracing::warn!(user_id = user.id(), "Unreadable document edit: {}", e);
            user.flash(&state, FlashLevel::Error, "Update failed: the upload could not be read.").await;
            return Ok(back);
        }
    };

    let document_type = match fields.document_type.as_deref() {
        None => doc.document_type,
        Some(raw) => match parse_document_type(Some(raw)) {
            Some(t) => t,
            None => {
                user.flash(&state, FlashLevel::Error, "Update failed for document_type: Select a valid choice.")
                    .await;
                return Ok(back);
            }
        },
    };

    match fields.file {
        Some((file_name, data)) => {
            let file_path = match store_file(&state, user.id(), document_type, &file_name, &data).await {
                Ok(path) => path,
                Err(message) => {
                    user.flash(&state, FlashLevel::Error, format!("Update failed for file: {message}")).await;
                    return Ok(back);
                }
            };
            state.documents().replace_file(id, document_type, &file_path, &file_name).await?;
            remove_file(&state, &doc.file_path).await;
        }
        None => {
            state.documents().set_type(id, document_type).await?;
        }
    }

    tracing::info!(user_id = user.id(), document_id = id, "Document updated");
    user.flash(&state, FlashLevel::Success, "Document updated successfully!").await;
    Ok(back)
}

pub async fn delete_document(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> PageResult<Redirect> {
    own_document(&state, &user, id).await?;
    if let Some(doc) = state.documents().delete(id).await? {
        remove_file(&state, &doc.file_path).await;
        tracing::info!(user_id = user.id(), document_id = id, "Document deleted");
        user.flash(&state, FlashLevel::Success, "Document deleted successfully!").await;
    }
    Ok(Redirect::to("/dashboard/student"))
}

fn content_type_for(path: &str) -> &'static str {
    match path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()).as_deref() {
        Some("pdf") => "application/pdf",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

/// Serve a stored file to its owner or to staff.
pub async fn download_document(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> PageResult<Response> {
    let doc = match state.documents().find(id).await? {
        Some(doc) if doc.user_id == user.id() || user.user.is_staff => doc,
        _ => return Err(PageError::NotFound(format!("document {id}"))),
    };

    let full: PathBuf = state.config.server.media_root.join(&doc.file_path);
    let data = tokio::fs::read(&full).await.map_err(|e| {
        tracing::error!("Stored file {} is unreadable: {}", full.display(), e);
        PageError::NotFound(format!("file for document {id}"))
    })?;

    let disposition = format!("inline; filename=\"{}\"", doc.original_name.replace(['"', '\\'], "_"));
    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(&doc.file_path).to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    )
        .into_response())
}
