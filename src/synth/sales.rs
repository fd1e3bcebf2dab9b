use chrono::{Duration, NaiveDateTime};
use fake::faker::address::raw::CountryName;
use fake::faker::internet::raw::SafeEmail;
use fake::faker::name::raw::Name;
use fake::locales::{Data, EN, FR_FR, JA_JP, PT_BR, ZH_CN};
use fake::Fake;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use super::round_cents;

pub struct Product {
    pub category: &'static str,
    pub name: &'static str,
    pub unit_price: f64,
}

const fn product(category: &'static str, name: &'static str, unit_price: f64) -> Product {
    Product {
        category,
        name,
        unit_price,
    }
}

pub static CATALOG: [Product; 11] = [
    product("Celulares", "iPhone 13", 850.0),
    product("Celulares", "Samsung Galaxy S22", 799.0),
    product("Celulares", "Google Pixel 6", 699.0),
    product("Celulares", "Xiaomi 12", 599.0),
    product("Celulares", "OnePlus 10 Pro", 750.0),
    product("Acessórios", "Carregador USB-C", 25.0),
    product("Acessórios", "Capa de Silicone", 15.0),
    product("Acessórios", "Fone de Ouvido Bluetooth", 50.0),
    product("Acessórios", "Smartwatch", 150.0),
    product("Acessórios", "Power Bank 10000mAh", 30.0),
    product("Acessórios", "Protetor de tela de vidro", 10.0),
];

/// One sale as written to `vendas_eletronicos.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaleRecord {
    #[serde(rename = "ID_Venda")]
    pub id: u64,
    #[serde(rename = "Data_Venda")]
    pub date: String,
    #[serde(rename = "ID_Cliente")]
    pub customer_id: String,
    #[serde(rename = "Nome_Cliente")]
    pub customer_name: String,
    #[serde(rename = "Email_Cliente")]
    pub customer_email: String,
    #[serde(rename = "País")]
    pub country: String,
    #[serde(rename = "Categoria_Produto")]
    pub category: String,
    #[serde(rename = "Produto")]
    pub product: String,
    #[serde(rename = "Preço_Unitário")]
    pub unit_price: f64,
    #[serde(rename = "Quantidade")]
    pub quantity: u32,
    #[serde(rename = "Total_Venda")]
    pub total: f64,
}

struct Customer {
    name: String,
    email: String,
    country: String,
}

fn customer_in<L: Data + Copy, R: Rng + ?Sized>(locale: L, rng: &mut R) -> Customer {
    Customer {
        name: Name(locale).fake_with_rng(rng),
        email: SafeEmail(locale).fake_with_rng(rng),
        country: CountryName(locale).fake_with_rng(rng),
    }
}

/// Customer data from a randomly chosen locale.
fn customer<R: Rng + ?Sized>(rng: &mut R) -> Customer {
    match rng.gen_range(0..5) {
        0 => customer_in(EN, rng),
        1 => customer_in(PT_BR, rng),
        2 => customer_in(FR_FR, rng),
        3 => customer_in(JA_JP, rng),
        _ => customer_in(ZH_CN, rng),
    }
}

/// `records` sales dated uniformly within the year before `now`.
pub fn generate<R: Rng + ?Sized>(
    rng: &mut R,
    records: usize,
    now: NaiveDateTime,
) -> Vec<SaleRecord> {
    let window = Duration::days(365).num_seconds();
    (1..=records as u64)
        .map(|id| {
            let who = customer(rng);
            let date = now - Duration::seconds(rng.gen_range(0..=window));
            let customer_id = uuid::Builder::from_random_bytes(rng.gen()).into_uuid();
            let item = CATALOG.choose(rng).unwrap_or(&CATALOG[0]);
            let quantity = rng.gen_range(1..=5u32);
            SaleRecord {
                id,
                date: date.format("%Y-%m-%d %H:%M:%S").to_string(),
                customer_id: customer_id.to_string(),
                customer_name: who.name,
                customer_email: who.email,
                country: who.country,
                category: item.category.to_string(),
                product: item.name.to_string(),
                unit_price: item.unit_price,
                quantity,
                total: round_cents(item.unit_price * quantity as f64),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 30)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn records_respect_catalog_and_window() {
        let mut rng = StdRng::seed_from_u64(7);
        let rows = generate(&mut rng, 200, now());
        assert_eq!(rows.len(), 200);
        assert_eq!(rows.first().map(|r| r.id), Some(1));
        let earliest = now() - Duration::days(365);
        for r in &rows {
            let item = CATALOG.iter().find(|p| p.name == r.product).unwrap();
            assert_eq!(item.category, r.category);
            assert_eq!(r.unit_price, item.unit_price);
            assert!((1..=5).contains(&r.quantity));
            assert_eq!(r.total, round_cents(r.unit_price * r.quantity as f64));
            let d = NaiveDateTime::parse_from_str(&r.date, "%Y-%m-%d %H:%M:%S").unwrap();
            assert!(d >= earliest && d <= now());
            assert_eq!(r.customer_id.len(), 36);
            assert!(!r.customer_name.is_empty());
        }
    }

    #[test]
    fn same_seed_same_records() {
        let a = generate(&mut StdRng::seed_from_u64(3), 20, now());
        let b = generate(&mut StdRng::seed_from_u64(3), 20, now());
        assert_eq!(a, b);
    }
}
