use serde::{Deserialize, Serialize};
use crate::compiler::ast::Field;

/// Value(s) of one raw tag of a series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TagValue {
    pub group: u16,
    pub element: u16,
    #[serde(rename = "Value", default)]
    pub values: Vec<String>,
}

impl TagValue {
    pub fn new(group: u16, element: u16, values: Vec<String>) -> Self {
        Self { group, element, values }
    }
}

/// Metadata snapshot of one image series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SeriesRecord {
    pub series_description: String,
    pub study_description: String,
    pub modality: String,
    pub sequence_name: String,
    pub manufacturer: String,
    pub manufacturer_model_name: String,
    pub classify_types: Vec<String>,
    #[serde(rename = "PatientID")]
    pub patient_id: String,
    pub patient_name: String,
    #[serde(alias = "NumImages")]
    pub image_count: i64,
    #[serde(alias = "SeriesNumber")]
    pub sequence_number: i64,
    #[serde(alias = "All")]
    pub tags: Vec<TagValue>,
}

impl SeriesRecord {
    /// Identity of the patient the series belongs to
    pub fn ancestor(&self) -> String {
        format!("{}{}", self.patient_id, self.patient_name)
    }

    /// Borrowed view of a field's value(s).
    ///
    /// Returns `None` when the record cannot provide the field at all
    /// (unknown names, tags the series does not carry).
    pub fn field_values(&self, field: &Field) -> Option<FieldValues<'_>> {
        let values = match field {
            Field::SeriesDescription => FieldValues::Text(&self.series_description),
            Field::StudyDescription => FieldValues::Text(&self.study_description),
            Field::Modality => FieldValues::Text(&self.modality),
            Field::SequenceName => FieldValues::Text(&self.sequence_name),
            Field::Manufacturer => FieldValues::Text(&self.manufacturer),
            Field::ManufacturerModelName => FieldValues::Text(&self.manufacturer_model_name),
            Field::ClassifyTypes => FieldValues::List(&self.classify_types),
            Field::PatientId => FieldValues::Text(&self.patient_id),
            Field::PatientName => FieldValues::Text(&self.patient_name),
            Field::ImageCount => FieldValues::Number(self.image_count),
            Field::SequenceNumber => FieldValues::Number(self.sequence_number),
            Field::Tag { group, element } => FieldValues::Tag(self.tag_values(*group, *element)?),
            Field::Unknown(_) => return None,
        };
        Some(values)
    }

    /// Raw values of a tag, `None` when the series does not carry it
    pub fn tag_values(&self, group: u16, element: u16) -> Option<&[String]> {
        self.tags
            .iter()
            .find(|t| t.group == group && t.element == element)
            .map(|t| t.values.as_slice())
    }
}

/// Value(s) of one field of a record, borrowed from the record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValues<'a> {
    Text(&'a str),
    Number(i64),
    List(&'a [String]),
    /// Raw tag values, seen with surrounding whitespace removed
    Tag(&'a [String]),
}

impl FieldValues<'_> {
    /// Does any value satisfy `test`. An empty list is tested as one empty string.
    pub fn any(&self, mut test: impl FnMut(&str) -> bool) -> bool {
        match self {
            FieldValues::Text(value) => test(value),
            FieldValues::Number(n) => test(&n.to_string()),
            FieldValues::List(values) if values.is_empty() => test(""),
            FieldValues::List(values) => values.iter().any(|v| test(v)),
            FieldValues::Tag(values) if values.is_empty() => test(""),
            FieldValues::Tag(values) => values.iter().any(|v| test(v.trim())),
        }
    }

    /// Owned copies of the values as they are compared
    pub fn to_strings(&self) -> Vec<String> {
        match self {
            FieldValues::Text(value) => vec![value.to_string()],
            FieldValues::Number(n) => vec![n.to_string()],
            FieldValues::List(values) => values.to_vec(),
            FieldValues::Tag(values) => values.iter().map(|v| v.trim().to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_values() {
        let record = SeriesRecord {
            modality: "MR".to_string(),
            image_count: 176,
            classify_types: vec!["T1".to_string(), "AXIAL".to_string()],
            tags: vec![TagValue::new(0x0008, 0x103e, vec![" t1_mprage ".to_string()])],
            ..Default::default()
        };
        assert_eq!(record.field_values(&Field::Modality), Some(FieldValues::Text("MR")));
        assert_eq!(record.field_values(&Field::ImageCount), Some(FieldValues::Number(176)));
        assert_eq!(record.field_values(&Field::ClassifyTypes).unwrap().to_strings().len(), 2);

        let tag = record.field_values(&Field::Tag { group: 0x0008, element: 0x103e }).unwrap();
        assert_eq!(tag.to_strings(), vec!["t1_mprage".to_string()]);
        assert!(tag.any(|v| v == "t1_mprage"));
        assert_eq!(record.tag_values(0x0008, 0x103e), Some(&[" t1_mprage ".to_string()][..]));

        assert_eq!(record.field_values(&Field::Tag { group: 0x0018, element: 0x0050 }), None);
        assert_eq!(record.field_values(&Field::Unknown("x".to_string())), None);
    }

    #[test]
    fn test_empty_list_is_one_empty_value() {
        let record = SeriesRecord::default();
        let values = record.field_values(&Field::ClassifyTypes).unwrap();
        let mut seen = Vec::new();
        assert!(!values.any(|v| {
            seen.push(v.to_string());
            false
        }));
        assert_eq!(seen, vec![String::new()]);
        assert!(values.to_strings().is_empty());
    }

    #[test]
    fn test_deserialize_with_defaults_and_aliases() {
        let json = r#"{"Modality":"CT","NumImages":12,"PatientID":"p1","PatientName":"Doe",
                       "All":[{"Group":32,"Element":17,"Value":["4"]}]}"#;
        let record: SeriesRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.modality, "CT");
        assert_eq!(record.image_count, 12);
        assert_eq!(record.sequence_number, 0);
        assert_eq!(record.series_description, "");
        assert_eq!(record.ancestor(), "p1Doe");
        assert_eq!(record.tags[0].values, vec!["4".to_string()]);
    }
}
