//! Validation utilities for the point-of-sale backend
//!
//! Includes Mexico-specific checks (RFC tax id, 10-digit phone numbers).

use rust_decimal::Decimal;

// ============================================================================
// General Validations
// ============================================================================

/// Validate that a required text field is not blank
pub fn validate_required(value: &str) -> Result<(), &'static str> {
    if value.trim().is_empty() {
        return Err("Field is required");
    }
    Ok(())
}

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err("Invalid email format");
    };
    if local.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.')
    {
        return Err("Invalid email format");
    }
    Ok(())
}

/// Validate SKU format (letters, digits and dashes, up to 64 characters)
pub fn validate_sku(sku: &str) -> Result<(), &'static str> {
    if sku.is_empty() || sku.len() > 64 {
        return Err("SKU must be between 1 and 64 characters");
    }
    if !sku
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err("SKU may only contain letters, digits, '-' and '_'");
    }
    Ok(())
}

/// Validate username (3-64 characters, no whitespace)
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.len() < 3 || username.len() > 64 {
        return Err("Username must be between 3 and 64 characters");
    }
    if username.chars().any(char::is_whitespace) {
        return Err("Username cannot contain spaces");
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 6 {
        return Err("Password must be at least 6 characters");
    }
    Ok(())
}

/// Largest money amount a `NUMERIC(12, 2)` column holds
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// Validate a money amount that may be zero (prices)
pub fn validate_non_negative_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Amount cannot be negative");
    }
    if amount > MAX_AMOUNT {
        return Err("Amount cannot exceed 9999999999.99");
    }
    Ok(())
}

/// Validate a money amount that must be strictly positive (purchase costs)
pub fn validate_positive_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount <= Decimal::ZERO {
        return Err("Amount must be greater than zero");
    }
    if amount > MAX_AMOUNT {
        return Err("Amount cannot exceed 9999999999.99");
    }
    Ok(())
}

/// Validate a line quantity
pub fn validate_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

// ============================================================================
// Mexico-Specific Validations
// ============================================================================

/// Validate Mexican phone number format
/// Accepts: 5512345678, 55-1234-5678, +52 55 1234 5678
pub fn validate_mx_phone(phone: &str) -> Result<(), &'static str> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() == 10 {
        return Ok(());
    }
    // Country code prefix
    if digits.len() == 12 && digits.starts_with("52") {
        return Ok(());
    }

    Err("Phone number must have 10 digits")
}

/// Validate RFC (Registro Federal de Contribuyentes)
/// 13 characters for individuals, 12 for companies:
/// name letters, birth/incorporation date YYMMDD, 3-character homoclave
pub fn validate_rfc(rfc: &str) -> Result<(), &'static str> {
    let rfc = rfc.trim().to_uppercase();
    let chars: Vec<char> = rfc.chars().collect();

    let letters = match chars.len() {
        13 => 4,
        12 => 3,
        _ => return Err("RFC must be 12 or 13 characters"),
    };

    let is_name_char = |c: &char| c.is_ascii_uppercase() || *c == 'Ñ' || *c == '&';
    if !chars[..letters].iter().all(is_name_char) {
        return Err("Invalid RFC name prefix");
    }

    let date = &chars[letters..letters + 6];
    if !date.iter().all(char::is_ascii_digit) {
        return Err("Invalid RFC date segment");
    }
    let two = |i: usize| date[i].to_digit(10).unwrap_or(0) * 10 + date[i + 1].to_digit(10).unwrap_or(0);
    let (month, day) = (two(2), two(4));
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err("Invalid RFC date segment");
    }

    if !chars[letters + 6..].iter().all(char::is_ascii_alphanumeric) {
        return Err("Invalid RFC homoclave");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc_accepts_individual_and_company() {
        assert!(validate_rfc("ANAC800101XYZ").is_ok());
        assert!(validate_rfc("anac800101xyz").is_ok());
        assert!(validate_rfc("PAP010203AB1").is_ok());
    }

    #[test]
    fn rfc_rejects_bad_dates_and_lengths() {
        assert!(validate_rfc("ANAC801301XYZ").is_err());
        assert!(validate_rfc("ANAC800100XYZ").is_err());
        assert!(validate_rfc("ANAC8001XYZ").is_err());
        assert!(validate_rfc("1NAC800101XYZ").is_err());
    }

    #[test]
    fn phone_accepts_ten_digits_with_separators() {
        assert!(validate_mx_phone("55-1234-5678").is_ok());
        assert!(validate_mx_phone("+52 55 1234 5678").is_ok());
        assert!(validate_mx_phone("12345").is_err());
    }

    #[test]
    fn email_requires_domain() {
        assert!(validate_email("ana@example.com").is_ok());
        assert!(validate_email("ana@example").is_err());
        assert!(validate_email("@example.com").is_err());
    }
}
