//! Renders the outstanding pairing code as a scannable QR code.

use crate::error::{connection_error, ConnectionErrorKind, Error};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use connection::PairingArtifact;
use qrcode::render::{svg, unicode};
use qrcode::QrCode;
use serde::Serialize;
use utoipa::ToSchema;

const SVG_MIN_DIMENSION: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `data:image/svg+xml;base64,...` URL, ready for an `<img>` tag.
    Svg,
    /// Unicode block art for terminals.
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RenderedPairing {
    pub content: String,
    pub issued_at: DateTime<Utc>,
}

pub fn render(artifact: &PairingArtifact, format: Format) -> Result<RenderedPairing, Error> {
    let code = QrCode::new(artifact.code.as_bytes())?;
    let content = match format {
        Format::Svg => {
            let image = code
                .render::<svg::Color>()
                .min_dimensions(SVG_MIN_DIMENSION, SVG_MIN_DIMENSION)
                .build();
            format!("data:image/svg+xml;base64,{}", STANDARD.encode(image))
        }
        Format::Text => code
            .render::<unicode::Dense1x2>()
            .dark_color(unicode::Dense1x2::Light)
            .light_color(unicode::Dense1x2::Dark)
            .build(),
    };

    Ok(RenderedPairing {
        content,
        issued_at: artifact.issued_at,
    })
}

/// The current pairing code, rendered. Fails when no code is outstanding.
pub async fn current(
    manager: &connection::Manager,
    format: Format,
) -> Result<RenderedPairing, Error> {
    let artifact = manager
        .current_pairing_artifact()
        .await?
        .ok_or_else(|| connection_error(ConnectionErrorKind::NoPairingArtifact))?;
    render(&artifact, format)
}
