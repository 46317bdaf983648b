//! Normalização de telefone, nome de instância e datas exibidas/registradas

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

/// Remove tudo que não for dígito antes de enviar o número para APIs externas
///
/// # Exemplos
/// ```
/// use nova_europa_conexoes::utils::normalization::normalize_phone;
///
/// assert_eq!(normalize_phone("+55 11 99999-8888"), "5511999998888");
/// ```
pub fn normalize_phone(input: &str) -> String {
    evolution::digits_only(input)
}

/// Nome da instância: sem espaços nas pontas e sem espaços repetidos
pub fn normalize_instance_name(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Formata um número brasileiro na máscara `+55 11 99999-9999`.
/// Números fora do padrão de 12/13 dígitos são devolvidos só com dígitos.
pub fn format_phone_br(input: &str) -> String {
    let digits = normalize_phone(input);

    match digits.len() {
        13 => format!("+{} {} {}-{}", &digits[..2], &digits[2..4], &digits[4..9], &digits[9..]),
        12 => format!("+{} {} {}-{}", &digits[..2], &digits[2..4], &digits[4..8], &digits[8..]),
        _ => digits,
    }
}

/// `YYYY-MM-DD HH:mm` no fuso fixo (formato exigido pelo registro de conexão)
pub fn format_registro_timestamp(instant: DateTime<Utc>, timezone: FixedOffset) -> String {
    instant.with_timezone(&timezone).format("%Y-%m-%d %H:%M").to_string()
}

/// Converte a data de cadastro devolvida pelo backend para `dd/mm/YYYY HH:MM`.
///
/// Aceita RFC 3339 (convertido para o fuso) e `YYYY-MM-DD HH:MM[:SS]` (já no fuso).
/// Valores que não parseiam são devolvidos como vieram.
pub fn format_data_cadastro(raw: &str, timezone: FixedOffset) -> String {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&timezone).format("%d/%m/%Y %H:%M").to_string();
    }

    for pattern in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, pattern) {
            if let Some(local) = timezone.from_local_datetime(&naive).single() {
                return local.format("%d/%m/%Y %H:%M").to_string();
            }
        }
    }

    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brasilia() -> FixedOffset {
        FixedOffset::west_opt(3 * 3600).unwrap()
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("+55 11 99999-8888"), "5511999998888");
        assert_eq!(normalize_phone("5511999998888"), "5511999998888");
        assert_eq!(normalize_phone("(11) 4002-8922"), "1140028922");
    }

    #[test]
    fn test_normalize_instance_name() {
        assert_eq!(normalize_instance_name("  Loja   Centro "), "Loja Centro");
        assert_eq!(normalize_instance_name("   "), "");
    }

    #[test]
    fn test_format_phone_br() {
        assert_eq!(format_phone_br("5511999998888"), "+55 11 99999-8888");
        assert_eq!(format_phone_br("551140028922"), "+55 11 4002-8922");
        assert_eq!(format_phone_br("123"), "123");
    }

    #[test]
    fn test_format_registro_timestamp_uses_fixed_offset() {
        let instant = DateTime::parse_from_rfc3339("2025-03-10T02:30:00Z")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(format_registro_timestamp(instant, brasilia()), "2025-03-09 23:30");
    }

    #[test]
    fn test_format_data_cadastro() {
        assert_eq!(
            format_data_cadastro("2025-06-11T18:05:00.000Z", brasilia()),
            "11/06/2025 15:05"
        );
        assert_eq!(format_data_cadastro("2025-06-11 15:05:33", brasilia()), "11/06/2025 15:05");
        assert_eq!(format_data_cadastro("ontem", brasilia()), "ontem");
    }
}
