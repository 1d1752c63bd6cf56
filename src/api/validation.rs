use super::ApiError;

pub fn validate_id(resource: &str, id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid {} ID: {}. ID must be a positive integer",
            resource, id
        )));
    }
    Ok(id)
}

pub fn validate_name(field: &str, name: &str) -> Result<String, ApiError> {
    const MAX_LEN: usize = 100;

    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{} cannot be empty", field)));
    }

    if trimmed.chars().count() > MAX_LEN {
        return Err(ApiError::validation(format!(
            "{} must be {} characters or less",
            field, MAX_LEN
        )));
    }

    Ok(trimmed.to_string())
}

pub fn validate_price(price: f64) -> Result<f64, ApiError> {
    if !price.is_finite() || price < 0.0 {
        return Err(ApiError::validation(format!(
            "Invalid price: {}. Price must be zero or greater",
            price
        )));
    }
    Ok(price)
}

pub fn validate_search_query(query: &str) -> Option<String> {
    let trimmed = query.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
