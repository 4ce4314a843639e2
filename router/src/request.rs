use crate::optimizer::RouteRequest;
use serde_json::Value;
use wh_common::error::{Result, WarehouseError};
use wh_common::geom::coord::GridCoord;

fn invalid(msg: impl Into<String>) -> WarehouseError {
    WarehouseError::InvalidInput(msg.into())
}

pub fn parse_path_request(body: &str) -> Result<RouteRequest> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| invalid(format!("body is not JSON: {}", e)))?;

    let (ids, depot) = match &value {
        Value::Array(items) => (items, None),
        Value::Object(map) => {
            let ids = map
                .get("targetBinIds")
                .or_else(|| map.get("binIds"))
                .ok_or_else(|| invalid("missing 'targetBinIds'"))?;
            let ids = ids
                .as_array()
                .ok_or_else(|| invalid("'targetBinIds' must be a list"))?;
            let depot = map.get("depot").map(parse_depot).transpose()?;
            (ids, depot)
        }
        _ => return Err(invalid("body must be an object or a list of bin ids")),
    };

    let ids = ids
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| invalid(format!("bin id at index {} is not a string", i)))
        })
        .collect::<Result<Vec<String>>>()?;

    let request = RouteRequest::new(ids);
    Ok(match depot {
        Some(d) => request.with_depot(d),
        None => request,
    })
}

fn parse_depot(v: &Value) -> Result<GridCoord> {
    let coord = |key: &str| -> Result<u32> {
        v.get(key)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| invalid(format!("depot.{} must be a non-negative integer", key)))
    };
    Ok(GridCoord::new(coord("x")?, coord("y")?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_body_with_depot() {
        let req = parse_path_request(r#"{"targetBinIds": ["A", "B", "A"], "depot": {"x": 2, "y": 3}}"#)
            .unwrap();
        assert_eq!(req.target_bin_ids, vec!["A", "B"]);
        assert_eq!(req.depot, Some(GridCoord::new(2, 3)));
    }

    #[test]
    fn legacy_key_and_bare_list() {
        assert_eq!(
            parse_path_request(r#"{"binIds": ["X"]}"#).unwrap().target_bin_ids,
            vec!["X"]
        );
        assert_eq!(
            parse_path_request(r#"["X", "Y"]"#).unwrap().target_bin_ids,
            vec!["X", "Y"]
        );
    }

    #[test]
    fn malformed_bodies_are_rejected() {
        for body in [
            "not json",
            r#""A""#,
            r#"{"targetBinIds": "A"}"#,
            r#"{"targetBinIds": ["A", 7]}"#,
            r#"{"other": []}"#,
            r#"{"targetBinIds": [], "depot": {"x": -1, "y": 0}}"#,
        ] {
            assert!(
                matches!(parse_path_request(body), Err(WarehouseError::InvalidInput(_))),
                "accepted {}",
                body
            );
        }
    }
}
