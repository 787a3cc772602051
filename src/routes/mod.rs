pub(crate) mod forecast;
pub(crate) mod health;
