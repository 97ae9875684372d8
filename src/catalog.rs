use crate::error::ValidationError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

const EMBEDDED_CATALOG: &str = include_str!("../fixtures/catalog.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Major {
    pub id: u8,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: u8,
    pub name: String,
    #[serde(default)]
    pub majors: Vec<Major>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassInfo {
    pub id: i64,
    pub code: String,
    pub name: String,
}

/// Import payload for `catalog.import` and the embedded default.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogData {
    pub departments: Vec<Department>,
    #[serde(default)]
    pub classes: Vec<ClassInfo>,
}

/// Departments with their majors, plus the class list. Only built through
/// [`Catalog::new`], so every instance has passed validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    departments: BTreeMap<u8, Department>,
    classes: BTreeMap<i64, ClassInfo>,
}

impl Catalog {
    pub fn new(
        departments: Vec<Department>,
        classes: Vec<ClassInfo>,
    ) -> Result<Self, ValidationError> {
        let mut by_id = BTreeMap::new();
        let mut names = HashSet::new();
        for mut d in departments {
            check_id("departmentId", d.id)?;
            let name = d.name.trim().to_string();
            if name.is_empty() {
                return Err(ValidationError::EmptyField("department name"));
            }
            if !names.insert(name.clone()) {
                return Err(ValidationError::Duplicate {
                    kind: "department name",
                    key: name,
                });
            }
            d.name = name;

            let mut major_ids = HashSet::new();
            for m in &mut d.majors {
                check_id("majorId", m.id)?;
                m.name = m.name.trim().to_string();
                if m.name.is_empty() {
                    return Err(ValidationError::EmptyField("major name"));
                }
                if !major_ids.insert(m.id) {
                    return Err(ValidationError::Duplicate {
                        kind: "major",
                        key: format!("{}/{}", d.id, m.id),
                    });
                }
            }
            d.majors.sort_by_key(|m| m.id);

            let id = d.id;
            if by_id.insert(id, d).is_some() {
                return Err(ValidationError::Duplicate {
                    kind: "department",
                    key: id.to_string(),
                });
            }
        }

        let mut class_by_id = BTreeMap::new();
        let mut codes = HashSet::new();
        for mut c in classes {
            c.code = c.code.trim().to_string();
            if c.code.is_empty() {
                return Err(ValidationError::EmptyField("class code"));
            }
            if !codes.insert(c.code.clone()) {
                return Err(ValidationError::Duplicate {
                    kind: "class code",
                    key: c.code,
                });
            }
            let id = c.id;
            if class_by_id.insert(id, c).is_some() {
                return Err(ValidationError::Duplicate {
                    kind: "class",
                    key: id.to_string(),
                });
            }
        }

        Ok(Self {
            departments: by_id,
            classes: class_by_id,
        })
    }

    pub fn from_data(data: CatalogData) -> Result<Self, ValidationError> {
        Self::new(data.departments, data.classes)
    }

    /// Catalog seeded into fresh workspaces.
    pub fn embedded() -> anyhow::Result<Self> {
        let data: CatalogData =
            serde_json::from_str(EMBEDDED_CATALOG).context("failed to parse embedded catalog")?;
        Ok(Self::from_data(data)?)
    }

    pub fn is_empty(&self) -> bool {
        self.departments.is_empty() && self.classes.is_empty()
    }

    pub fn departments(&self) -> impl Iterator<Item = &Department> {
        self.departments.values()
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.values()
    }

    pub fn major_count(&self) -> usize {
        self.departments.values().map(|d| d.majors.len()).sum()
    }

    pub fn department(&self, id: u8) -> Option<&Department> {
        self.departments.get(&id)
    }

    pub fn major(&self, department_id: u8, major_id: u8) -> Option<&Major> {
        self.department(department_id)?
            .majors
            .iter()
            .find(|m| m.id == major_id)
    }

    pub fn class(&self, id: i64) -> Option<&ClassInfo> {
        self.classes.get(&id)
    }

    pub fn class_by_code(&self, code: &str) -> Option<&ClassInfo> {
        self.classes.values().find(|c| c.code == code)
    }

    /// The major must exist and belong to the given department.
    pub fn require_major(&self, department_id: u8, major_id: u8) -> Result<&Major, ValidationError> {
        if self.department(department_id).is_none() {
            return Err(ValidationError::UnknownDepartment(department_id));
        }
        self.major(department_id, major_id)
            .ok_or(ValidationError::UnknownMajor {
                department_id,
                major_id,
            })
    }

    pub fn department_name(&self, id: u8) -> Option<&str> {
        self.department(id).map(|d| d.name.as_str())
    }

    pub fn major_name(&self, department_id: u8, major_id: u8) -> Option<&str> {
        self.major(department_id, major_id).map(|m| m.name.as_str())
    }

    pub fn class_name(&self, id: i64) -> Option<&str> {
        self.class(id).map(|c| c.name.as_str())
    }
}

fn check_id(field: &'static str, id: u8) -> Result<(), ValidationError> {
    crate::error::check_range(field, i64::from(id), 0, 99).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dept(id: u8, name: &str, majors: &[(u8, &str)]) -> Department {
        Department {
            id,
            name: name.into(),
            majors: majors
                .iter()
                .map(|(id, name)| Major {
                    id: *id,
                    name: (*name).into(),
                })
                .collect(),
        }
    }

    #[test]
    fn embedded_catalog_is_valid() {
        let c = Catalog::embedded().expect("embedded catalog");
        assert!(!c.is_empty());
        assert!(c.require_major(5, 4).is_ok());
        assert!(c.class_by_code("21050401").is_some());
    }

    #[test]
    fn majors_are_scoped_to_their_department() {
        let c = Catalog::new(
            vec![
                dept(1, "Agriculture", &[(1, "Agronomy")]),
                dept(5, "Information", &[(4, "Software Engineering"), (3, "Computer Science")]),
            ],
            vec![],
        )
        .unwrap();
        assert_eq!(c.major_name(5, 4), Some("Software Engineering"));
        assert_eq!(c.major_name(1, 4), None);
        assert_eq!(
            c.require_major(1, 4),
            Err(ValidationError::UnknownMajor {
                department_id: 1,
                major_id: 4
            })
        );
        assert_eq!(c.require_major(9, 1), Err(ValidationError::UnknownDepartment(9)));
        let ids: Vec<u8> = c.department(5).unwrap().majors.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 4]);
        assert_eq!(c.major_count(), 3);
    }

    #[test]
    fn rejects_out_of_range_and_duplicates() {
        assert!(matches!(
            Catalog::new(vec![dept(100, "Too big", &[])], vec![]),
            Err(ValidationError::OutOfRange { field: "departmentId", .. })
        ));
        assert!(matches!(
            Catalog::new(vec![dept(1, "A", &[(2, "x"), (2, "y")])], vec![]),
            Err(ValidationError::Duplicate { kind: "major", .. })
        ));
        assert!(matches!(
            Catalog::new(vec![dept(1, "A", &[]), dept(1, "B", &[])], vec![]),
            Err(ValidationError::Duplicate { kind: "department", .. })
        ));
        let classes = vec![
            ClassInfo {
                id: 1,
                code: "21050401".into(),
                name: "SE 1".into(),
            },
            ClassInfo {
                id: 2,
                code: "21050401".into(),
                name: "SE 2".into(),
            },
        ];
        assert!(matches!(
            Catalog::new(vec![], classes),
            Err(ValidationError::Duplicate { kind: "class code", .. })
        ));
    }
}
