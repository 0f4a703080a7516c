use domain::pairing::Format;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub(crate) enum PairingFormat {
    #[default]
    Svg,
    Text,
}

impl From<PairingFormat> for Format {
    fn from(format: PairingFormat) -> Self {
        match format {
            PairingFormat::Svg => Format::Svg,
            PairingFormat::Text => Format::Text,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct PairingParams {
    /// `svg` (default) for a data URL, `text` for terminal block art.
    pub(crate) format: Option<PairingFormat>,
}
