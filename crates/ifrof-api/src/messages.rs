//! Client-facing message catalogue.
//!
//! Every error string returned to a client comes from here. Internal error
//! text is logged and never placed in a response body.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::ACCEPT_LANGUAGE;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use ifrof_search::ValidationError;

/// Response language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    Ar,
    En,
    Zh,
}

impl Locale {
    /// Pick the locale from the first language tag of `Accept-Language`.
    ///
    /// Unknown or missing tags fall back to Arabic.
    pub fn from_accept_language(value: Option<&str>) -> Self {
        let primary = value
            .and_then(|v| v.split(',').next())
            .and_then(|tag| tag.split(';').next())
            .and_then(|tag| tag.trim().split(['-', '_']).next())
            .map(|s| s.to_ascii_lowercase());

        match primary.as_deref() {
            Some("en") => Self::En,
            Some("zh") => Self::Zh,
            _ => Self::Ar,
        }
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self::from_accept_language(headers.get(ACCEPT_LANGUAGE).and_then(|v| v.to_str().ok()))
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Locale {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// Kinds of client-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKey {
    NoInput,
    NameTooLong,
    InvalidUrl,
    InvalidHsCode,
    ImageTooLarge,
    InvalidImage,
    InvalidQuantity,
    MalformedBody,
    Unauthorized,
    DailyLimit,
    TooManyRequests,
    NotFound,
    Internal,
}

impl From<&ValidationError> for MessageKey {
    fn from(err: &ValidationError) -> Self {
        match err {
            ValidationError::NoInput => Self::NoInput,
            ValidationError::NameTooLong { .. } => Self::NameTooLong,
            ValidationError::InvalidUrl => Self::InvalidUrl,
            ValidationError::InvalidHsCode => Self::InvalidHsCode,
            ValidationError::ImageTooLarge { .. } => Self::ImageTooLarge,
            ValidationError::InvalidImage => Self::InvalidImage,
            ValidationError::InvalidQuantity => Self::InvalidQuantity,
        }
    }
}

pub fn message(key: MessageKey, locale: Locale) -> &'static str {
    use Locale::*;
    use MessageKey::*;

    match (key, locale) {
        (NoInput, Ar) => "يرجى تقديم صورة أو رابط أو اسم منتج أو رمز HS",
        (NoInput, En) => "Please provide an image, a product URL, a product name, or an HS code",
        (NoInput, Zh) => "请提供产品图片、链接、名称或HS编码",

        (NameTooLong, Ar) => "اسم المنتج طويل جدًا (الحد الأقصى 200 حرف)",
        (NameTooLong, En) => "Product name is too long (maximum 200 characters)",
        (NameTooLong, Zh) => "产品名称过长（最多200个字符）",

        (InvalidUrl, Ar) => "رابط المنتج غير صالح",
        (InvalidUrl, En) => "The product URL is not valid",
        (InvalidUrl, Zh) => "产品链接无效",

        (InvalidHsCode, Ar) => "رمز HS غير صالح",
        (InvalidHsCode, En) => "The HS code is not valid",
        (InvalidHsCode, Zh) => "HS编码无效",

        (ImageTooLarge, Ar) => "حجم الصورة كبير جدًا (الحد الأقصى 5 ميغابايت)",
        (ImageTooLarge, En) => "The image is too large (maximum 5 MB)",
        (ImageTooLarge, Zh) => "图片过大（最大5MB）",

        (InvalidImage, Ar) => "ملف الصورة غير صالح",
        (InvalidImage, En) => "The image could not be read",
        (InvalidImage, Zh) => "图片无效",

        (InvalidQuantity, Ar) => "الكمية يجب أن تكون رقمًا صحيحًا موجبًا",
        (InvalidQuantity, En) => "Quantity must be a positive whole number",
        (InvalidQuantity, Zh) => "数量必须是正整数",

        (MalformedBody, Ar) => "صيغة الطلب غير صحيحة",
        (MalformedBody, En) => "The request body is not valid JSON",
        (MalformedBody, Zh) => "请求格式错误",

        (Unauthorized, Ar) => "يجب تسجيل الدخول للبحث عن المصانع",
        (Unauthorized, En) => "Please sign in to search for factories",
        (Unauthorized, Zh) => "请登录后再搜索工厂",

        (DailyLimit, Ar) => "لقد وصلت إلى الحد اليومي لعمليات البحث، حاول مرة أخرى لاحقًا",
        (DailyLimit, En) => "You have reached your daily search limit, please try again later",
        (DailyLimit, Zh) => "您已达到每日搜索上限，请稍后再试",

        (TooManyRequests, Ar) => "طلبات كثيرة جدًا، يرجى الانتظار قليلًا",
        (TooManyRequests, En) => "Too many requests, please wait a moment",
        (TooManyRequests, Zh) => "请求过多，请稍候再试",

        (NotFound, Ar) => "عملية البحث غير موجودة",
        (NotFound, En) => "Search not found",
        (NotFound, Zh) => "未找到该搜索",

        (Internal, Ar) => "حدث خطأ أثناء البحث، يرجى المحاولة مرة أخرى",
        (Internal, En) => "Something went wrong while searching, please try again",
        (Internal, Zh) => "搜索时出错，请重试",
    }
}
