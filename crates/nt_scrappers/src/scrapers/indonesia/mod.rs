use super::Region;

pub mod cnbc;
pub mod cnn;
pub mod detik;

pub use cnbc::CnbcScraper;
pub use cnn::CnnScraper;
pub use detik::DetikScraper;

pub const REGION: Region = Region {
    name: "indonesia",
    emoji: "🇮🇩",
};

/// Date format shared by detik and CNN Indonesia, e.g. `Sabtu, 05 Okt 2024 14:30 WIB`
pub(crate) const WIB_DATE_FORMAT: &str = "%A, %d %b %Y %H:%M WIB";
