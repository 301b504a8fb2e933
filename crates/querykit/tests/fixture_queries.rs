//! End-to-end builder scenarios against the in-memory provider and the
//! four-row `TestTable` fixture.

#![allow(dead_code)]

use chrono::NaiveDate;
use querykit::testing::MemoryProvider;
use querykit::{Entity, OutcomeKind, Repository, TypedRepository, Value};

#[derive(Debug, Default, Clone, PartialEq, Entity)]
#[orm(table = "TestTable")]
struct TestItem {
    #[orm(column = "Id")]
    id: i32,
    #[orm(column = "Name")]
    name: Option<String>,
    #[orm(column = "Age")]
    age: i32,
    #[orm(column = "Created")]
    created: NaiveDate,
}

const COLUMNS: [&str; 4] = ["Id", "Name", "Age", "Created"];

fn day(y: i32, m: u32, d: u32) -> Value {
    NaiveDate::from_ymd_opt(y, m, d).map_or(Value::Null, Value::Date)
}

fn rows() -> Vec<Vec<Value>> {
    vec![
        vec![1.into(), "Victor".into(), 26.into(), day(2023, 1, 1)],
        vec![2.into(), "Alejandro".into(), 27.into(), day(2023, 1, 2)],
        vec![3.into(), Value::Null, 28.into(), day(2023, 1, 3)],
        vec![4.into(), "Asuaje".into(), 29.into(), day(2023, 1, 4)],
    ]
}

fn repository() -> Repository<MemoryProvider> {
    let provider = MemoryProvider::new();
    provider.respond_rows(&COLUMNS, rows());
    Repository::new(provider)
}

#[tokio::test]
async fn auto_select_reads_all_fixture_rows() {
    let repo = repository();
    let outcome = repo.auto_select::<TestItem>().build().unwrap().get_list().await;
    assert_eq!(outcome.kind(), OutcomeKind::Success);

    let items = outcome.expect_value();
    assert_eq!(items.len(), 4);
    assert_eq!(items[2].name, None);
    assert_eq!(
        items[0].created,
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
    );
    assert_eq!(
        repo.provider().last_statement().unwrap().sql(),
        "SELECT Id, Name, Age, Created FROM TestTable"
    );
}

#[tokio::test]
async fn grouped_filter_reaches_the_provider() {
    let repo = repository();
    let _ = repo
        .select_fields::<TestItem, _, _>(["Id", "Name"])
        .from("TestTable")
        .where_(|f| {
            f.group(|g| {
                g.push(|f| {
                    f.column("Id").not_null().and("Age").less_or_equal_to("500");
                });
            })
            .or_group(|g| {
                g.push(|f| {
                    f.column("Id").equal_to("1").and("Name").like("Victor");
                });
            });
        })
        .build()
        .unwrap()
        .get_list()
        .await;

    let statement = repo.provider().last_statement().unwrap();
    assert_eq!(
        statement.sql(),
        "SELECT Id, Name FROM TestTable WHERE ( Id IS NOT NULL AND Age <= @Age0 ) OR ( Id = @Id1 AND Name LIKE @Name2 )"
    );
    assert_eq!(
        statement.params(),
        &[
            Value::from("500"),
            Value::from("1"),
            Value::from("%Victor%")
        ]
    );
}

#[tokio::test]
async fn projected_subset_leaves_other_fields_default() {
    let repo = repository();
    let items = repo
        .select_fields::<TestItem, _, _>(["Id", "Name"])
        .from("TestTable")
        .build()
        .unwrap()
        .get_list()
        .await
        .expect_value();
    assert_eq!(items.len(), 4);
    assert!(items.iter().all(|i| i.age == 0));
    assert_eq!(items[3].name.as_deref(), Some("Asuaje"));
}

#[tokio::test]
async fn typed_repository_round() {
    let provider = MemoryProvider::new();
    provider
        .respond_rows(&["ID"], vec![vec![5.into()]])
        .respond_affected(1)
        .respond_affected(1);
    let repo =
        TypedRepository::<TestItem, _>::for_default_table(Repository::new(provider)).unwrap();

    let key = repo
        .insert([("Name", Value::from("Victor")), ("Age", Value::from(30))])
        .unwrap()
        .execute_scalar()
        .await;
    assert_eq!(key.value(), Some(&Value::Int(5)));

    let updated = repo
        .update()
        .field_values([("Age", 31)])
        .where_(|f| {
            f.column("Id").equal_to(5);
        })
        .unwrap()
        .execute()
        .await;
    assert_eq!(updated.value(), Some(&1));

    let deleted = repo
        .delete()
        .where_(|f| {
            f.column("Id").in_list([5, 6]);
        })
        .execute()
        .await;
    assert_eq!(deleted.value(), Some(&1));

    assert!(repo.save_changes().await.is_success());

    let sql: Vec<String> = repo
        .repository()
        .provider()
        .statements()
        .iter()
        .map(|s| s.sql().to_string())
        .collect();
    assert_eq!(
        sql,
        vec![
            "INSERT INTO TestTable (Name, Age) OUTPUT Inserted.ID VALUES (@Name0, @Age1)",
            "UPDATE TestTable SET Age = @Age0 WHERE Id = @Id1",
            "DELETE FROM TestTable WHERE Id IN ( @Id0, @Id1 )",
        ]
    );
    assert_eq!(repo.repository().provider().commits(), 1);
}
