//! Site bridges shipped with the crate.
//!
//! Selectors and site URLs live here and nowhere else. Each bridge parses
//! pages in synchronous functions returning owned items, so no document is
//! held across an `.await`.

pub mod ao3;
pub mod gq_magazine;
pub mod jornal_de_noticias;
pub mod omg_ubuntu;
pub mod pokemon_news;
pub mod treasury_auctions;
pub mod uber_newsroom;

use std::sync::Arc;

use crate::bridge::DynBridge;

pub use ao3::Ao3Bridge;
pub use gq_magazine::GqMagazineBridge;
pub use jornal_de_noticias::JornalDeNoticiasBridge;
pub use omg_ubuntu::OmgUbuntuBridge;
pub use pokemon_news::PokemonNewsBridge;
pub use treasury_auctions::TreasuryAuctionsBridge;
pub use uber_newsroom::UberNewsroomBridge;

pub fn all() -> Vec<Arc<dyn DynBridge>> {
    vec![
        Arc::new(Ao3Bridge) as Arc<dyn DynBridge>,
        Arc::new(GqMagazineBridge),
        Arc::new(JornalDeNoticiasBridge),
        Arc::new(OmgUbuntuBridge),
        Arc::new(PokemonNewsBridge),
        Arc::new(TreasuryAuctionsBridge),
        Arc::new(UberNewsroomBridge),
    ]
}
