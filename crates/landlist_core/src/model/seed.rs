//! Built-in example listings used when no persisted collection is available.
//!
//! Records are kept in raw wire shape and go through the sanitizer like any
//! other input. None of them carries a term contract, so the seed never
//! expires.

use serde_json::{json, Value};

/// Raw seed records in persisted blob shape.
pub fn seed_records() -> Vec<Value> {
    vec![
        json!({
            "id": 1,
            "title": "Terreno amplo perto do Lago Verde",
            "location": "Alter do Chão/PA",
            "fullAddress": "Travessa Lago Verde, s/n, Alter do Chão, Santarém - PA",
            "price": "R$ 120.000",
            "tags": ["Perto da praia", "Investimento"],
            "features": ["Plano", "Murado", "Pronto para construir"],
            "description": "Terreno plano a poucos minutos do Lago Verde, ideal para casa de praia ou pousada.",
            "area": "600m²",
            "solarPosition": "Nascente",
            "propertyType": "Lote/Terreno",
            "images": [
                "https://images.unsplash.com/photo-1500382017468-9049fed747ef",
                "https://images.unsplash.com/photo-1501785888041-af3ef285b470"
            ],
            "code": "7001"
        }),
        json!({
            "id": 2,
            "title": "Lote em condomínio fechado",
            "location": "Santarém/PA",
            "fullAddress": "Rodovia Everaldo Martins, km 12, Santarém - PA",
            "price": "R$ 85.000",
            "tags": "Condomínio, Segurança",
            "features": "Portaria 24h, Rua asfaltada",
            "description": "Lote em condomínio com infraestrutura completa e acesso rápido à rodovia.",
            "area": "360m²",
            "solarPosition": "Poente",
            "propertyType": "Lote em condomínio",
            "imageUrl": "https://images.unsplash.com/photo-1449844908441-8829872d2607",
            "code": "7002"
        }),
        json!({
            "id": 3,
            "title": "Área rural com igarapé",
            "location": "Belterra/PA",
            "fullAddress": "Estrada de Belterra, ramal do Igarapé, Belterra - PA",
            "price": "R$ 310.000",
            "tags": ["Natureza", "Chácara"],
            "features": ["Igarapé", "Mata preservada", "Energia elétrica"],
            "description": "Área rural com igarapé de água cristalina e mata preservada.",
            "area": "2,5 hectares",
            "solarPosition": "Norte",
            "propertyType": "Área rural",
            "images": ["https://images.unsplash.com/photo-1472214103451-9374bd1c798e"],
            "code": "7003",
            "createdAt": "2025-01-10T12:00:00.000Z",
            "contractType": "indefinite"
        }),
    ]
}
