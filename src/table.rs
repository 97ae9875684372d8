use crate::catalog::Catalog;
use crate::error::ValidationError;
use crate::student::{status_label, StudentRecord};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};

pub const PAGE_SIZES: [usize; 4] = [5, 10, 25, 50];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    Select,
    StudentId,
    Name,
    Email,
    Location,
    Birthday,
    MajorId,
    DepartmentId,
    ClassId,
    IsActivated,
    Actions,
}

impl Column {
    pub const ALL: [Column; 11] = [
        Self::Select,
        Self::StudentId,
        Self::Name,
        Self::Email,
        Self::Location,
        Self::Birthday,
        Self::MajorId,
        Self::DepartmentId,
        Self::ClassId,
        Self::IsActivated,
        Self::Actions,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::StudentId => "studentId",
            Self::Name => "name",
            Self::Email => "email",
            Self::Location => "location",
            Self::Birthday => "birthday",
            Self::MajorId => "majorId",
            Self::DepartmentId => "departmentId",
            Self::ClassId => "classId",
            Self::IsActivated => "isActivated",
            Self::Actions => "actions",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == s)
    }

    fn parse_or_err(s: &str) -> Result<Self, ValidationError> {
        Self::parse(s).ok_or_else(|| ValidationError::UnknownColumn(s.to_string()))
    }

    pub fn header(self) -> &'static str {
        match self {
            Self::Select => "",
            Self::StudentId => "Student ID",
            Self::Name => "Name",
            Self::Email => "Email",
            Self::Location => "Location",
            Self::Birthday => "Birthday",
            Self::MajorId => "Major",
            Self::DepartmentId => "Department",
            Self::ClassId => "Class",
            Self::IsActivated => "Status",
            Self::Actions => "Actions",
        }
    }

    pub fn can_hide(self) -> bool {
        !matches!(
            self,
            Self::Select | Self::StudentId | Self::Name | Self::Actions
        )
    }

    pub fn can_sort(self) -> bool {
        !matches!(self, Self::Select | Self::Actions)
    }
}

/// Case-insensitive containment in `"{name} {email}"`. Empty query matches all.
pub fn text_matches(query: &str, record: &StudentRecord) -> bool {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return true;
    }
    format!("{} {}", record.name, record.student_email)
        .to_lowercase()
        .contains(&needle)
}

/// An empty accepted set is "no filter", not "match nothing".
pub fn status_matches(accepted: &BTreeSet<bool>, record: &StudentRecord) -> bool {
    accepted.is_empty() || accepted.contains(&record.is_activated)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnFilter {
    Text(String),
    Status(BTreeSet<bool>),
}

impl ColumnFilter {
    pub fn matches(&self, record: &StudentRecord) -> bool {
        match self {
            Self::Text(q) => text_matches(q, record),
            Self::Status(set) => status_matches(set, record),
        }
    }

    fn is_inert(&self) -> bool {
        match self {
            Self::Text(q) => q.is_empty(),
            Self::Status(set) => set.is_empty(),
        }
    }
}

/// At most one predicate per column; a record must satisfy all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnFilters(BTreeMap<Column, ColumnFilter>);

impl ColumnFilters {
    /// Setting an empty query or empty status set clears the column's filter.
    pub fn set(&mut self, column: Column, filter: ColumnFilter) {
        if filter.is_inert() {
            self.0.remove(&column);
        } else {
            self.0.insert(column, filter);
        }
    }

    pub fn matches(&self, record: &StudentRecord) -> bool {
        self.0.values().all(|f| f.matches(record))
    }

    fn matches_except(&self, record: &StudentRecord, skip: Column) -> bool {
        self.0
            .iter()
            .filter(|(c, _)| **c != skip)
            .all(|(_, f)| f.matches(record))
    }

    pub fn apply<'a, I>(&self, records: I) -> Vec<&'a StudentRecord>
    where
        I: IntoIterator<Item = &'a StudentRecord>,
    {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub column: Column,
    pub desc: bool,
}

impl SortSpec {
    pub fn asc(column: Column) -> Self {
        Self {
            column,
            desc: false,
        }
    }
}

fn cmp_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn compare_column(column: Column, desc: bool, a: &StudentRecord, b: &StudentRecord) -> Ordering {
    let ord = match column {
        Column::StudentId => cmp_text(&a.student_id, &b.student_id),
        Column::Name => cmp_text(&a.name, &b.name),
        Column::Email => cmp_text(&a.student_email, &b.student_email),
        Column::Location => cmp_text(&a.location, &b.location),
        Column::Birthday => {
            // Missing dates stay at the bottom in both directions.
            return match (a.birthday, b.birthday) {
                (Some(x), Some(y)) if desc => y.cmp(&x),
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
        }
        Column::MajorId => a.major_id.cmp(&b.major_id),
        Column::DepartmentId => a.department_id.cmp(&b.department_id),
        Column::ClassId => a.class_id.cmp(&b.class_id),
        Column::IsActivated => a.is_activated.cmp(&b.is_activated),
        Column::Select | Column::Actions => Ordering::Equal,
    };
    if desc {
        ord.reverse()
    } else {
        ord
    }
}

/// Stable multi-column sort; earlier specs take precedence.
pub fn sort_records(rows: &mut [&StudentRecord], specs: &[SortSpec]) {
    if specs.is_empty() {
        return;
    }
    rows.sort_by(|a, b| {
        specs
            .iter()
            .map(|s| compare_column(s.column, s.desc, a, b))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page_index: usize,
    pub page_size: usize,
}

impl Pagination {
    pub fn new(page_index: usize, page_size: usize) -> Result<Self, ValidationError> {
        if !PAGE_SIZES.contains(&page_size) {
            return Err(ValidationError::InvalidPageSize(page_size));
        }
        Ok(Self {
            page_index,
            page_size,
        })
    }

    fn bounds(self, len: usize) -> (usize, usize) {
        let start = self.page_index.saturating_mul(self.page_size).min(len);
        let end = start.saturating_add(self.page_size).min(len);
        (start, end)
    }
}

/// The `page_index`-th window of `page_size` items. Short or empty past the end.
pub fn page_window<T>(items: &[T], pagination: Pagination) -> &[T] {
    let (start, end) = pagination.bounds(items.len());
    &items[start..end]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page_index: usize,
    pub page_size: usize,
    pub page_count: usize,
    /// 1-based position of the first row on the page, 0 if the page is empty.
    pub start: usize,
    pub end: usize,
    pub can_previous_page: bool,
    pub can_next_page: bool,
}

impl PageInfo {
    pub fn compute(total: usize, pagination: Pagination) -> Self {
        let page_count = total.div_ceil(pagination.page_size);
        let (start, end) = pagination.bounds(total);
        Self {
            page_index: pagination.page_index,
            page_size: pagination.page_size,
            page_count,
            start: if end > start { start + 1 } else { 0 },
            end: if end > start { end } else { 0 },
            can_previous_page: pagination.page_index > 0,
            can_next_page: pagination.page_index.saturating_add(1) < page_count,
        }
    }
}

/// Returns a fresh collection without the selected ids; survivors keep their order.
pub fn bulk_delete(records: &[StudentRecord], selected: &HashSet<String>) -> Vec<StudentRecord> {
    records
        .iter()
        .filter(|r| !selected.contains(&r.id))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnVisibility(BTreeMap<Column, bool>);

impl ColumnVisibility {
    pub fn toggle(&mut self, column: Column, visible: bool) -> Result<(), ValidationError> {
        if !visible && !column.can_hide() {
            return Err(ValidationError::ColumnNotHideable(column.key().to_string()));
        }
        self.0.insert(column, visible);
        Ok(())
    }

    pub fn is_visible(&self, column: Column) -> bool {
        self.0.get(&column).copied().unwrap_or(true)
    }

    pub fn visible_columns(&self) -> Vec<Column> {
        Column::ALL
            .into_iter()
            .filter(|c| self.is_visible(*c))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusFacet {
    pub value: bool,
    pub label: &'static str,
    pub count: usize,
}

/// Distinct status values with counts, `false` first. Absent values are omitted.
pub fn status_facets<'a, I>(records: I) -> Vec<StatusFacet>
where
    I: IntoIterator<Item = &'a StudentRecord>,
{
    let mut counts: BTreeMap<bool, usize> = BTreeMap::new();
    for r in records {
        *counts.entry(r.is_activated).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(value, count)| StatusFacet {
            value,
            label: status_label(value),
            count,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionSummary {
    pub selected_count: usize,
    pub all_page_rows_selected: bool,
    pub some_page_rows_selected: bool,
}

pub fn selection_summary(
    records: &[StudentRecord],
    page: &[&StudentRecord],
    selected: &HashSet<String>,
) -> SelectionSummary {
    let selected_count = records.iter().filter(|r| selected.contains(&r.id)).count();
    let on_page = page.iter().filter(|r| selected.contains(&r.id)).count();
    let all = !page.is_empty() && on_page == page.len();
    SelectionSummary {
        selected_count,
        all_page_rows_selected: all,
        some_page_rows_selected: !all && on_page > 0,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SortParam {
    pub id: String,
    #[serde(default)]
    pub desc: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParam {
    #[serde(default)]
    pub page_index: usize,
    pub page_size: Option<usize>,
}

/// Raw `students.query` params as sent by the front-end.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableStateParams {
    pub global_filter: Option<String>,
    pub status_filter: Vec<bool>,
    pub sorting: Option<Vec<SortParam>>,
    pub pagination: Option<PaginationParam>,
    pub column_visibility: BTreeMap<String, bool>,
    pub selected_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableState {
    pub filters: ColumnFilters,
    pub sorting: Vec<SortSpec>,
    pub pagination: Pagination,
    pub visibility: ColumnVisibility,
    pub selected: HashSet<String>,
}

impl TableState {
    pub fn resolve(params: TableStateParams, default_page_size: usize) -> Result<Self, ValidationError> {
        let mut filters = ColumnFilters::default();
        if let Some(q) = params.global_filter {
            filters.set(Column::Name, ColumnFilter::Text(q));
        }
        filters.set(
            Column::IsActivated,
            ColumnFilter::Status(params.status_filter.into_iter().collect()),
        );

        let sorting = match params.sorting {
            None => vec![SortSpec::asc(Column::Name)],
            Some(list) => list
                .into_iter()
                .map(|p| {
                    let column = Column::parse_or_err(&p.id)?;
                    if !column.can_sort() {
                        return Err(ValidationError::ColumnNotSortable(p.id));
                    }
                    Ok(SortSpec {
                        column,
                        desc: p.desc,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
        };

        let pagination = match params.pagination {
            None => Pagination::new(0, default_page_size)?,
            Some(p) => Pagination::new(p.page_index, p.page_size.unwrap_or(default_page_size))?,
        };

        let mut visibility = ColumnVisibility::default();
        for (key, visible) in params.column_visibility {
            visibility.toggle(Column::parse_or_err(&key)?, visible)?;
        }

        Ok(Self {
            filters,
            sorting,
            pagination,
            visibility,
            selected: params.selected_ids.into_iter().collect(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub id: &'static str,
    pub header: &'static str,
    pub can_hide: bool,
    pub can_sort: bool,
    pub visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sorted: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub rows: Vec<Value>,
    /// Rows left after filtering, across all pages.
    pub row_count: usize,
    pub total_count: usize,
    pub page: PageInfo,
    pub columns: Vec<ColumnInfo>,
    pub status_facets: Vec<StatusFacet>,
    pub selection: SelectionSummary,
}

fn project_row(record: &StudentRecord, columns: &[Column], catalog: &Catalog) -> Value {
    let mut row = Map::new();
    row.insert("id".into(), json!(record.id));
    for c in columns {
        match c {
            Column::StudentId => {
                row.insert("studentId".into(), json!(record.student_id));
            }
            Column::Name => {
                row.insert("name".into(), json!(record.name));
            }
            Column::Email => {
                row.insert("studentEmail".into(), json!(record.student_email));
            }
            Column::Location => {
                row.insert("location".into(), json!(record.location));
            }
            Column::Birthday => {
                row.insert("birthday".into(), json!(record.birthday));
            }
            Column::MajorId => {
                row.insert("majorId".into(), json!(record.major_id));
                row.insert(
                    "majorName".into(),
                    json!(catalog.major_name(record.department_id, record.major_id)),
                );
            }
            Column::DepartmentId => {
                row.insert("departmentId".into(), json!(record.department_id));
                row.insert(
                    "departmentName".into(),
                    json!(catalog.department_name(record.department_id)),
                );
            }
            Column::ClassId => {
                row.insert("classId".into(), json!(record.class_id));
                row.insert("className".into(), json!(catalog.class_name(record.class_id)));
            }
            Column::IsActivated => {
                row.insert("isActivated".into(), json!(record.is_activated));
                row.insert("statusLabel".into(), json!(record.status_label()));
            }
            Column::Select | Column::Actions => {}
        }
    }
    Value::Object(row)
}

/// Filter, sort, paginate and project one page of the table.
pub fn run_query(records: &[StudentRecord], state: &TableState, catalog: &Catalog) -> QueryResult {
    let mut filtered = state.filters.apply(records);
    sort_records(&mut filtered, &state.sorting);

    let page_rows = page_window(&filtered, state.pagination);
    let visible = state.visibility.visible_columns();
    let rows = page_rows
        .iter()
        .map(|r| project_row(r, &visible, catalog))
        .collect();

    // Facet counts ignore the status filter itself, so unchecked options still show totals.
    let facets = status_facets(
        records
            .iter()
            .filter(|r| state.filters.matches_except(r, Column::IsActivated)),
    );

    let columns = Column::ALL
        .into_iter()
        .map(|c| ColumnInfo {
            id: c.key(),
            header: c.header(),
            can_hide: c.can_hide(),
            can_sort: c.can_sort(),
            visible: state.visibility.is_visible(c),
            sorted: state
                .sorting
                .iter()
                .find(|s| s.column == c)
                .map(|s| if s.desc { "desc" } else { "asc" }),
        })
        .collect();

    QueryResult {
        rows,
        row_count: filtered.len(),
        total_count: records.len(),
        page: PageInfo::compute(filtered.len(), state.pagination),
        columns,
        status_facets: facets,
        selection: selection_summary(records, page_rows, &state.selected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rec(n: usize, name: &str, email: &str, active: bool) -> StudentRecord {
        StudentRecord {
            id: format!("r{n:02}"),
            student_id: format!("2150{:04}", n),
            name: name.into(),
            student_email: email.into(),
            location: String::new(),
            birthday: None,
            department_id: 5,
            major_id: 4,
            class_id: 6,
            is_activated: active,
        }
    }

    fn numbered(count: usize) -> Vec<StudentRecord> {
        (1..=count)
            .map(|n| rec(n, &format!("Student {n:02}"), &format!("s{n}@example.edu"), n % 3 != 0))
            .collect()
    }

    fn sample() -> Vec<StudentRecord> {
        vec![
            rec(1, "Alex Thompson", "alex.t@example.edu", true),
            rec(2, "Sarah Chen", "sarah.chen@example.edu", true),
            rec(3, "james wilson", "j.wilson@example.edu", false),
            rec(4, "Maria Garcia", "maria@thompson.org", true),
        ]
    }

    fn ids(rows: &[&StudentRecord]) -> Vec<String> {
        rows.iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn text_filter_spans_name_and_email_case_insensitively() {
        let records = sample();
        let mut filters = ColumnFilters::default();
        filters.set(Column::Name, ColumnFilter::Text("THOMPSON".into()));
        assert_eq!(ids(&filters.apply(&records)), vec!["r01", "r04"]);

        filters.set(Column::Name, ColumnFilter::Text("".into()));
        assert_eq!(filters, ColumnFilters::default());
        assert_eq!(filters.apply(&records).len(), 4);
    }

    #[test]
    fn text_filter_is_idempotent() {
        let records = numbered(30);
        let mut filters = ColumnFilters::default();
        filters.set(Column::Name, ColumnFilter::Text("student 1".into()));
        let once = filters.apply(&records);
        let twice = filters.apply(once.iter().copied());
        assert_eq!(once, twice);
        assert_eq!(once.len(), 10);
    }

    #[test]
    fn empty_status_set_matches_everything() {
        let records = sample();
        let empty = BTreeSet::new();
        assert!(records.iter().all(|r| status_matches(&empty, r)));

        let inactive_only: BTreeSet<bool> = [false].into_iter().collect();
        let mut filters = ColumnFilters::default();
        filters.set(Column::IsActivated, ColumnFilter::Status(inactive_only));
        assert_eq!(ids(&filters.apply(&records)), vec!["r03"]);
    }

    #[test]
    fn column_filters_combine_with_and() {
        let records = sample();
        let mut filters = ColumnFilters::default();
        filters.set(Column::Name, ColumnFilter::Text("example.edu".into()));
        filters.set(
            Column::IsActivated,
            ColumnFilter::Status([true].into_iter().collect()),
        );
        assert_eq!(ids(&filters.apply(&records)), vec!["r01", "r02"]);
    }

    #[test]
    fn bulk_delete_keeps_order_of_survivors() {
        let records = numbered(6);
        let selected: HashSet<String> = ["r02", "r05", "missing"].iter().map(|s| s.to_string()).collect();
        let left = bulk_delete(&records, &selected);
        let left_ids: Vec<&str> = left.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(left_ids, vec!["r01", "r03", "r04", "r06"]);
        assert_eq!(records.len(), 6);
    }

    #[test]
    fn pagination_returns_short_last_page() {
        let records = numbered(25);
        let first = page_window(&records, Pagination::new(0, 10).unwrap());
        assert_eq!(first.len(), 10);
        assert_eq!(first[0].id, "r01");
        assert_eq!(first[9].id, "r10");

        let last = page_window(&records, Pagination::new(2, 10).unwrap());
        assert_eq!(last.len(), 5);
        assert_eq!(last[0].id, "r21");
        assert_eq!(last[4].id, "r25");

        assert!(page_window(&records, Pagination::new(7, 10).unwrap()).is_empty());
        assert_eq!(
            Pagination::new(0, 20),
            Err(ValidationError::InvalidPageSize(20))
        );
    }

    #[test]
    fn huge_page_index_yields_an_empty_last_page() {
        let records = numbered(12);
        let params = TableStateParams {
            pagination: Some(PaginationParam {
                page_index: usize::MAX,
                page_size: Some(10),
            }),
            ..TableStateParams::default()
        };
        let state = TableState::resolve(params, 10).unwrap();
        let result = run_query(&records, &state, &Catalog::default());
        assert!(result.rows.is_empty());
        assert_eq!(result.row_count, 12);
        assert_eq!(result.page.page_count, 2);
        assert_eq!((result.page.start, result.page.end), (0, 0));
        assert!(!result.page.can_next_page);
        assert!(result.page.can_previous_page);
    }

    #[test]
    fn page_info_reports_range_and_navigation() {
        let p = PageInfo::compute(25, Pagination::new(2, 10).unwrap());
        assert_eq!((p.start, p.end, p.page_count), (21, 25, 3));
        assert!(p.can_previous_page);
        assert!(!p.can_next_page);

        let empty = PageInfo::compute(0, Pagination::new(0, 5).unwrap());
        assert_eq!((empty.start, empty.end, empty.page_count), (0, 0, 0));
        assert!(!empty.can_next_page);
    }

    #[test]
    fn sort_by_name_is_case_insensitive_and_stable() {
        let records = sample();
        let mut rows: Vec<&StudentRecord> = records.iter().collect();
        sort_records(&mut rows, &[SortSpec::asc(Column::Name)]);
        assert_eq!(ids(&rows), vec!["r01", "r03", "r04", "r02"]);

        sort_records(
            &mut rows,
            &[
                SortSpec {
                    column: Column::IsActivated,
                    desc: true,
                },
                SortSpec::asc(Column::Name),
            ],
        );
        assert_eq!(ids(&rows), vec!["r01", "r04", "r02", "r03"]);
    }

    #[test]
    fn missing_birthdays_sort_last_both_ways() {
        let mut records = sample();
        records[0].birthday = NaiveDate::from_ymd_opt(2003, 1, 1);
        records[2].birthday = NaiveDate::from_ymd_opt(2002, 1, 1);
        let mut rows: Vec<&StudentRecord> = records.iter().collect();

        sort_records(&mut rows, &[SortSpec::asc(Column::Birthday)]);
        assert_eq!(ids(&rows), vec!["r03", "r01", "r02", "r04"]);

        sort_records(
            &mut rows,
            &[SortSpec {
                column: Column::Birthday,
                desc: true,
            }],
        );
        assert_eq!(ids(&rows), vec!["r01", "r03", "r02", "r04"]);
    }

    #[test]
    fn locked_columns_cannot_be_hidden() {
        let mut vis = ColumnVisibility::default();
        vis.toggle(Column::Location, false).unwrap();
        assert!(!vis.is_visible(Column::Location));
        assert_eq!(
            vis.toggle(Column::Name, false),
            Err(ValidationError::ColumnNotHideable("name".into()))
        );
        assert!(vis.toggle(Column::Name, true).is_ok());
        assert!(!vis.visible_columns().contains(&Column::Location));
    }

    #[test]
    fn facets_ignore_the_status_filter() {
        let records = sample();
        let params = TableStateParams {
            status_filter: vec![false],
            ..Default::default()
        };
        let state = TableState::resolve(params, 10).unwrap();
        let result = run_query(&records, &state, &Catalog::default());
        assert_eq!(result.row_count, 1);
        assert_eq!(
            result.status_facets,
            vec![
                StatusFacet {
                    value: false,
                    label: "Inactive",
                    count: 1
                },
                StatusFacet {
                    value: true,
                    label: "Active",
                    count: 3
                },
            ]
        );
    }

    #[test]
    fn query_projects_only_visible_columns() {
        let records = numbered(12);
        let mut visibility = BTreeMap::new();
        visibility.insert("email".to_string(), false);
        let params = TableStateParams {
            sorting: Some(vec![SortParam {
                id: "studentId".into(),
                desc: true,
            }]),
            pagination: Some(PaginationParam {
                page_index: 1,
                page_size: Some(5),
            }),
            column_visibility: visibility,
            selected_ids: vec!["r07".into(), "r06".into(), "gone".into()],
            ..Default::default()
        };
        let state = TableState::resolve(params, 10).unwrap();
        let result = run_query(&records, &state, &Catalog::default());

        assert_eq!(result.rows.len(), 5);
        assert_eq!(result.rows[0]["id"], "r07");
        assert!(result.rows[0].get("studentEmail").is_none());
        assert_eq!(result.rows[0]["statusLabel"], "Active");
        assert_eq!((result.page.start, result.page.end), (6, 10));
        assert_eq!(result.selection.selected_count, 2);
        assert!(result.selection.some_page_rows_selected);
        assert!(!result.selection.all_page_rows_selected);
        let student_id_col = result.columns.iter().find(|c| c.id == "studentId").unwrap();
        assert_eq!(student_id_col.sorted, Some("desc"));
    }

    #[test]
    fn resolve_rejects_bad_columns() {
        let params = TableStateParams {
            sorting: Some(vec![SortParam {
                id: "actions".into(),
                desc: false,
            }]),
            ..Default::default()
        };
        assert_eq!(
            TableState::resolve(params, 10),
            Err(ValidationError::ColumnNotSortable("actions".into()))
        );

        let mut visibility = BTreeMap::new();
        visibility.insert("nickname".to_string(), false);
        let params = TableStateParams {
            column_visibility: visibility,
            ..Default::default()
        };
        assert_eq!(
            TableState::resolve(params, 10),
            Err(ValidationError::UnknownColumn("nickname".into()))
        );
    }
}
