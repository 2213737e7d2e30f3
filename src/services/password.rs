use actix_web::web;
use bcrypt::DEFAULT_COST;

use crate::errors::AppError;

/// bcrypt hashing, run on the blocking pool so workers are not stalled.
pub async fn hash_password(password: String) -> Result<String, AppError> {
    Ok(web::block(move || bcrypt::hash(password, DEFAULT_COST)).await??)
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    Ok(web::block(move || bcrypt::verify(password, &hash)).await??)
}
