//! Validation utilities for the Warehouse Stock Management Platform
//!
//! Includes Chile-specific validations used on supplier provenance fields.

// ============================================================================
// Inventory Validations
// ============================================================================

/// Validate a product barcode (1-50 chars, alphanumeric plus dashes)
pub fn validate_barcode(barcode: &str) -> Result<(), &'static str> {
    if barcode.trim().is_empty() {
        return Err("Barcode cannot be empty");
    }
    if barcode.len() > 50 {
        return Err("Barcode must be at most 50 characters");
    }
    if !barcode
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err("Barcode must be alphanumeric");
    }
    Ok(())
}

/// Validate a product description (1-200 chars)
pub fn validate_description(description: &str) -> Result<(), &'static str> {
    if description.trim().is_empty() {
        return Err("Description cannot be empty");
    }
    if description.len() > 200 {
        return Err("Description must be at most 200 characters");
    }
    Ok(())
}

/// Validate a category name (1-50 chars)
pub fn validate_category(category: &str) -> Result<(), &'static str> {
    if category.trim().is_empty() {
        return Err("Category cannot be empty");
    }
    if category.len() > 50 {
        return Err("Category must be at most 50 characters");
    }
    Ok(())
}

/// Validate a movement quantity (strictly positive)
pub fn validate_quantity(quantity: i64) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate an adjustment delta (signed, but never zero)
pub fn validate_adjustment(delta: i64) -> Result<(), &'static str> {
    if delta == 0 {
        return Err("Adjustment cannot be zero");
    }
    Ok(())
}

/// Validate a lot identifier arriving from outside the engine.
/// Lot numbers are per-product positive sequence numbers; free-text labels
/// are rejected at every boundary.
pub fn validate_lot_number(lot_number: i64) -> Result<(), &'static str> {
    if lot_number <= 0 {
        return Err("Lot number must be a positive sequence number");
    }
    Ok(())
}

// ============================================================================
// Chile-Specific Validations
// ============================================================================

/// Validate a Chilean RUT (e.g., "12.345.678-5" or "12345678-K")
/// with its mod-11 check digit
pub fn validate_rut(rut: &str) -> Result<(), &'static str> {
    let cleaned: String = rut
        .chars()
        .filter(|c| *c != '.')
        .collect::<String>()
        .to_ascii_uppercase();

    let (body, dv) = match cleaned.rsplit_once('-') {
        Some((body, dv)) => (body, dv),
        None => return Err("RUT must include a check digit (e.g., 12345678-5)"),
    };

    if body.is_empty() || body.len() > 8 || !body.chars().all(|c| c.is_ascii_digit()) {
        return Err("RUT body must be 1-8 digits");
    }
    if dv.len() != 1 {
        return Err("RUT check digit must be a single character");
    }

    let mut sum = 0u32;
    let mut factor = 2u32;
    for c in body.chars().rev() {
        sum += c.to_digit(10).unwrap_or(0) * factor;
        factor = if factor == 7 { 2 } else { factor + 1 };
    }
    let expected = match 11 - (sum % 11) {
        11 => '0',
        10 => 'K',
        n => char::from_digit(n, 10).unwrap_or('0'),
    };

    if dv.chars().next() != Some(expected) {
        return Err("RUT check digit does not match");
    }
    Ok(())
}
