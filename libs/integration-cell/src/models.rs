use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct BotRegisterRequest {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub telegram_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct BotResetPasswordRequest {
    pub telegram_id: i64,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub telegram_id: i64,
}
