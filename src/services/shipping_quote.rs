//! Stateless shipping estimation from CEP pairs and package dimensions.
//!
//! This is a local heuristic, not a carrier-rate lookup: the zone is a
//! coarse proxy derived from the CEP prefixes, and the prices follow fixed
//! multipliers over a dimensional-weight base. Fully deterministic, no IO.

use crate::errors::ServiceError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Divisor for volumetric weight in cm³ per kg.
const VOLUMETRIC_DIVISOR: Decimal = dec!(6000);

/// Minimum base price in reais.
const BASE_PRICE_FLOOR: Decimal = dec!(5.00);

/// Package weight and dimensions as the storefront submits them: weight in
/// grams, dimensions in centimeters.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PackageDimensions {
    pub weight_grams: Decimal,
    pub length_cm: Decimal,
    pub width_cm: Decimal,
    pub height_cm: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DeliveryRange {
    pub min: u32,
    pub max: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ShippingOption {
    /// Stable service code (`sedex`, `pac`, `motoboy`, `free`).
    pub service: String,
    pub name: String,
    pub price: Decimal,
    pub delivery_range: DeliveryRange,
}

/// Strips everything that is not a digit and requires exactly 8 digits.
pub fn sanitize_zip(raw: &str) -> Result<String, ServiceError> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() != 8 {
        return Err(ServiceError::ValidationError(format!(
            "CEP inválido: {:?} (esperado 8 dígitos)",
            raw
        )));
    }

    Ok(digits)
}

fn prefix_value(zip: &str) -> i64 {
    zip.bytes()
        .take(2)
        .fold(0, |acc, b| acc * 10 + i64::from(b - b'0'))
}

/// Zone 1-4 from the distance between CEP prefixes. Both inputs must
/// already be sanitized 8-digit strings.
pub fn shipping_zone(origin_zip: &str, destination_zip: &str) -> u32 {
    let diff = (prefix_value(origin_zip) - prefix_value(destination_zip)).unsigned_abs();

    match diff {
        0..=5 => 1,
        6..=15 => 2,
        16..=30 => 3,
        _ => 4,
    }
}

/// Chargeable weight in kg: the larger of actual and volumetric weight.
pub fn chargeable_weight(package: &PackageDimensions) -> Decimal {
    let actual_kg = package.weight_grams / dec!(1000);
    let volumetric_kg =
        package.length_cm * package.width_cm * package.height_cm / VOLUMETRIC_DIVISOR;

    actual_kg.max(volumetric_kg)
}

fn base_price(package: &PackageDimensions) -> Decimal {
    (chargeable_weight(package) * dec!(2)).max(BASE_PRICE_FLOOR)
}

/// Computes every service option for a package between two CEPs.
///
/// The free option is always present with price zero; filtering it by an
/// order-total threshold is the caller's concern. Motoboy only appears for
/// nearby zones.
pub fn quote_options(
    origin_zip: &str,
    destination_zip: &str,
    package: &PackageDimensions,
) -> Result<Vec<ShippingOption>, ServiceError> {
    let origin = sanitize_zip(origin_zip)?;
    let destination = sanitize_zip(destination_zip)?;

    if package.weight_grams <= Decimal::ZERO
        || package.length_cm <= Decimal::ZERO
        || package.width_cm <= Decimal::ZERO
        || package.height_cm <= Decimal::ZERO
    {
        return Err(ServiceError::ValidationError(
            "Peso e dimensões devem ser positivos".to_string(),
        ));
    }

    let zone = shipping_zone(&origin, &destination);
    let zone_dec = Decimal::from(zone);
    let base = base_price(package);

    let mut options = vec![
        ShippingOption {
            service: "sedex".to_string(),
            name: "Expresso".to_string(),
            price: (base * (Decimal::ONE + zone_dec * dec!(0.3)) * dec!(1.5)).round_dp(2),
            delivery_range: DeliveryRange {
                min: zone,
                max: zone + 1,
            },
        },
        ShippingOption {
            service: "pac".to_string(),
            name: "Econômico".to_string(),
            price: (base * (Decimal::ONE + zone_dec * dec!(0.2))).round_dp(2),
            delivery_range: DeliveryRange {
                min: zone * 2 + 2,
                max: zone * 3 + 3,
            },
        },
    ];

    if zone <= 2 {
        options.push(ShippingOption {
            service: "motoboy".to_string(),
            name: "Motoboy (entrega rápida)".to_string(),
            price: (base * dec!(2.5)).round_dp(2),
            delivery_range: DeliveryRange { min: 0, max: 1 },
        });
    }

    options.push(ShippingOption {
        service: "free".to_string(),
        name: "Frete Grátis".to_string(),
        price: Decimal::ZERO,
        delivery_range: DeliveryRange {
            min: zone * 3 + 4,
            max: zone * 4 + 6,
        },
    });

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(weight_grams: i64, length: i64, width: i64, height: i64) -> PackageDimensions {
        PackageDimensions {
            weight_grams: Decimal::from(weight_grams),
            length_cm: Decimal::from(length),
            width_cm: Decimal::from(width),
            height_cm: Decimal::from(height),
        }
    }

    #[test]
    fn sanitize_strips_punctuation() {
        assert_eq!(sanitize_zip("01310-100").expect("valid"), "01310100");
        assert_eq!(sanitize_zip(" 01310100 ").expect("valid"), "01310100");
    }

    #[test]
    fn sanitize_rejects_wrong_length() {
        assert!(sanitize_zip("0131010").is_err());
        assert!(sanitize_zip("013101000").is_err());
        assert!(sanitize_zip("abcdefgh").is_err());
        assert!(sanitize_zip("").is_err());
    }

    #[test]
    fn zone_boundaries() {
        assert_eq!(shipping_zone("01000000", "06000000"), 1); // diff 5
        assert_eq!(shipping_zone("01000000", "07000000"), 2); // diff 6
        assert_eq!(shipping_zone("01000000", "16000000"), 2); // diff 15
        assert_eq!(shipping_zone("01000000", "17000000"), 3); // diff 16
    }

    #[test]
    fn zone_is_symmetric() {
        assert_eq!(
            shipping_zone("01000000", "31000000"),
            shipping_zone("31000000", "01000000")
        );
    }

    #[test]
    fn zone_upper_boundary() {
        assert_eq!(shipping_zone("01000000", "31000000"), 3); // diff 30
        assert_eq!(shipping_zone("01000000", "32000000"), 4); // diff 31
        assert_eq!(shipping_zone("01000000", "99000000"), 4);
    }

    #[test]
    fn volumetric_weight_dominates_light_packages() {
        // 30x20x10 / 6000 = 1.0 kg volumetric vs 0.5 kg actual
        let p = package(500, 30, 20, 10);
        assert_eq!(chargeable_weight(&p), dec!(1.0));
    }

    #[test]
    fn actual_weight_dominates_dense_packages() {
        let p = package(5000, 10, 10, 10); // volumetric ~0.167 kg
        assert_eq!(chargeable_weight(&p), dec!(5));
    }

    #[test]
    fn same_prefix_quote_matches_fixed_tariff() {
        // Zone 1: base = max(1.0*2, 5.00) = 5.00
        let options = quote_options("01310100", "01310100", &package(500, 30, 20, 10))
            .expect("valid quote");

        let by_service = |code: &str| {
            options
                .iter()
                .find(|o| o.service == code)
                .unwrap_or_else(|| panic!("missing option {}", code))
        };

        assert_eq!(by_service("sedex").price, dec!(9.75));
        assert_eq!(by_service("sedex").delivery_range, DeliveryRange { min: 1, max: 2 });
        assert_eq!(by_service("pac").price, dec!(6.00));
        assert_eq!(by_service("pac").delivery_range, DeliveryRange { min: 4, max: 6 });
        assert_eq!(by_service("motoboy").price, dec!(12.50));
        assert_eq!(by_service("free").price, Decimal::ZERO);
        assert_eq!(by_service("free").delivery_range, DeliveryRange { min: 7, max: 10 });
    }

    #[test]
    fn motoboy_absent_for_distant_zones() {
        let options = quote_options("01000000", "99000000", &package(500, 30, 20, 10))
            .expect("valid quote");
        assert!(options.iter().all(|o| o.service != "motoboy"));
        assert_eq!(options.len(), 3);
    }

    #[test]
    fn quote_rejects_bad_ceps() {
        let p = package(500, 30, 20, 10);
        assert!(quote_options("123", "01310100", &p).is_err());
        assert!(quote_options("01310100", "123", &p).is_err());
    }

    #[test]
    fn quote_rejects_non_positive_dimensions() {
        assert!(quote_options("01310100", "01310100", &package(0, 30, 20, 10)).is_err());
        assert!(quote_options("01310100", "01310100", &package(500, 0, 20, 10)).is_err());
        assert!(quote_options("01310100", "01310100", &package(500, 30, -1, 10)).is_err());
    }
}
