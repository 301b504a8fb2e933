use super::*;
use crate::value::Value;

fn texts(filter: &FilterBuilder) -> Vec<String> {
    filter
        .params()
        .values()
        .into_iter()
        .map(|v| v.to_string())
        .collect()
}

fn single(build: impl FnOnce(&mut FilterBuilder)) -> FilterBuilder {
    let mut filter = FilterBuilder::new();
    build(&mut filter);
    filter
}

#[test]
fn single_comparisons_start_with_where() {
    let cases = [
        (
            single(|f| {
                f.column("Id").equal_to(1);
            }),
            "WHERE Id = @Id0",
        ),
        (
            single(|f| {
                f.column("Id").not_equal(1);
            }),
            "WHERE Id <> @Id0",
        ),
        (
            single(|f| {
                f.column("Id").less_than(1);
            }),
            "WHERE Id < @Id0",
        ),
        (
            single(|f| {
                f.column("Id").greater_than(1);
            }),
            "WHERE Id > @Id0",
        ),
        (
            single(|f| {
                f.column("Id").less_or_equal_to(1);
            }),
            "WHERE Id <= @Id0",
        ),
        (
            single(|f| {
                f.column("Id").greater_or_equal_to(1);
            }),
            "WHERE Id >= @Id0",
        ),
        (
            single(|f| {
                f.column("Id").like(1);
            }),
            "WHERE Id LIKE @Id0",
        ),
    ];

    for (filter, expected) in cases {
        assert_eq!(filter.text(), expected);
        assert_eq!(filter.params().len(), 1, "{expected}");
    }
}

#[test]
fn is_and_not_write_keywords_inline() {
    let cases = [
        (Keyword::Null, "WHERE Active IS NULL", "WHERE Active NOT NULL"),
        (Keyword::True, "WHERE Active IS TRUE", "WHERE Active NOT TRUE"),
        (Keyword::False, "WHERE Active IS FALSE", "WHERE Active NOT FALSE"),
        (
            Keyword::Unknown,
            "WHERE Active IS UNKNOWN",
            "WHERE Active NOT UNKNOWN",
        ),
    ];

    for (keyword, is_text, not_text) in cases {
        let filter = single(|f| {
            f.column("Active").is(keyword);
        });
        assert_eq!(filter.text(), is_text);
        assert!(filter.params().is_empty());

        let filter = single(|f| {
            f.column("Active").not(keyword);
        });
        assert_eq!(filter.text(), not_text);
        assert!(filter.params().is_empty());
    }

    let mut filter = FilterBuilder::new();
    filter.column("Id").equal_to(1).and("Active").is(Keyword::True);
    filter.and("Name").equal_to("x");
    assert_eq!(
        filter.text(),
        "WHERE Id = @Id0 AND Active IS TRUE AND Name = @Name1"
    );
}

#[test]
fn null_checks_allocate_nothing() {
    let mut filter = FilterBuilder::new();
    filter.column("Id").not_null();
    assert_eq!(filter.text(), "WHERE Id IS NOT NULL");
    assert!(filter.params().is_empty());

    let mut filter = FilterBuilder::new();
    filter.column("Name").is_null();
    assert_eq!(filter.text(), "WHERE Name IS NULL");
}

#[test]
fn like_wraps_value_in_wildcards() {
    let mut filter = FilterBuilder::new();
    filter.column("Name").like("Victor");
    assert_eq!(filter.params().values(), vec![&Value::from("%Victor%")]);
}

#[test]
fn between_allocates_min_then_max() {
    let mut filter = FilterBuilder::new();
    filter.column("Id").between(1, 3);
    assert_eq!(filter.text(), "WHERE Id BETWEEN @Min0 AND @Max1");
    assert_eq!(filter.params().names(), vec!["Min0", "Max1"]);
    assert_eq!(texts(&filter), vec!["1", "3"]);
}

#[test]
fn in_list_allocates_one_parameter_per_value() {
    let mut filter = FilterBuilder::new();
    filter.column("Id").in_list([1, 2, 3, 4]);
    assert_eq!(filter.text(), "WHERE Id IN ( @Id0, @Id1, @Id2, @Id3 )");

    let mut filter = FilterBuilder::new();
    filter.column("Id").not_in(vec!["a", "b"]);
    assert_eq!(filter.text(), "WHERE Id NOT IN ( @Id0, @Id1 )");
}

#[test]
fn empty_in_list_is_a_no_op() {
    let mut filter = FilterBuilder::new();
    filter.column("Id").greater_than(2);
    filter.and("Name").in_list(Vec::<String>::new());
    filter.or("Name").not_in(Vec::<i32>::new());

    assert_eq!(filter.text(), "WHERE Id > @Id0");
    assert_eq!(filter.params().len(), 1);
}

#[test]
fn chained_conditions_keep_requested_connectors() {
    let mut filter = FilterBuilder::new();
    filter.column("Id").greater_than(1).and("Price").less_than(10);
    assert_eq!(filter.text(), "WHERE Id > @Id0 AND Price < @Price1");

    let mut filter = FilterBuilder::new();
    filter
        .column("Id")
        .in_list([1, 2, 3, 4])
        .or("Name")
        .equal_to("Victor");
    assert_eq!(
        filter.text(),
        "WHERE Id IN ( @Id0, @Id1, @Id2, @Id3 ) OR Name = @Name4"
    );
}

#[test]
fn qualified_columns_produce_clean_placeholders() {
    let mut filter = FilterBuilder::new();
    filter.column("a.Id").equal_to(7);
    assert_eq!(filter.text(), "WHERE a.Id = @aId0");
}

#[test]
fn two_groups_joined_with_or() {
    let mut filter = FilterBuilder::new();
    filter
        .group(|g| {
            g.push(|f| {
                f.column("Id").not_null().and("Price").less_or_equal_to("500");
            });
        })
        .or_group(|g| {
            g.push(|f| {
                f.column("Id").equal_to("1").and("Name").like("Victor");
            });
        });

    assert_eq!(
        filter.text(),
        "WHERE ( Id IS NOT NULL AND Price <= @Price0 ) OR ( Id = @Id1 AND Name LIKE @Name2 )"
    );
    assert_eq!(texts(&filter), vec!["500", "1", "%Victor%"]);
}

#[test]
fn group_callbacks_run_in_order() {
    let mut filter = FilterBuilder::new();
    filter.group(|g| {
        g.push(|f| {
            f.column("Id").equal_to(1);
        })
        .push(|f| {
            f.or("Id").equal_to(2);
        });
    });
    assert_eq!(filter.text(), "WHERE ( Id = @Id0 OR Id = @Id1 )");
}

#[test]
fn nested_groups_keep_ordinals_increasing() {
    let mut filter = FilterBuilder::new();
    filter
        .group(|g| {
            g.push(|f| {
                f.column("A").equal_to(1).and_group(|g| {
                    g.push(|f| {
                        f.column("B").equal_to(2).or_group(|g| {
                            g.push(|f| {
                                f.column("C").equal_to(3).and("D").equal_to(4);
                            });
                        });
                    });
                });
            });
        })
        .or_group(|g| {
            g.push(|f| {
                f.column("E").equal_to(5).and("F").equal_to(6);
            });
        });

    assert_eq!(
        filter.text(),
        "WHERE ( A = @A0 AND ( B = @B1 OR ( C = @C2 AND D = @D3 ) ) ) OR ( E = @E4 AND F = @F5 )"
    );
    assert_eq!(
        filter.params().names(),
        vec!["A0", "B1", "C2", "D3", "E4", "F5"]
    );
}

#[test]
fn group_without_callbacks_is_skipped() {
    let mut filter = FilterBuilder::new();
    filter.group(|_| {});
    assert_eq!(filter.text(), "");
    assert!(filter.params().is_empty());

    filter.column("Id").equal_to(1);
    let before = (filter.text(), filter.params().clone());
    filter.or_group(|_| {}).and_group(|_| {});
    assert_eq!((filter.text(), filter.params().clone()), before);
    assert_eq!(filter.text(), "WHERE Id = @Id0");
}

#[test]
fn group_whose_callbacks_add_nothing_is_dropped() {
    let mut filter = FilterBuilder::new();
    filter.and_group(|g| {
        g.push(|f| {
            f.column("Id").in_list(Vec::<i64>::new());
        });
    });
    assert!(filter.is_empty());

    filter.column("Id").equal_to(3);
    assert_eq!(filter.text(), "WHERE Id = @Id0");
}

#[test]
fn callbacks_can_capture_local_state() {
    let names = vec!["Victor".to_string(), "Asuaje".to_string()];
    let mut filter = FilterBuilder::new();
    filter.group(|g| {
        for name in &names {
            g.push(move |f| {
                f.or("Name").equal_to(name);
            });
        }
    });
    assert_eq!(filter.text(), "WHERE ( Name = @Name0 OR Name = @Name1 )");
}

#[test]
fn apply_and_replaces_leading_where() {
    let mut filter = FilterBuilder::new();
    filter.column("Age").greater_than(20);

    assert_eq!(
        filter.apply_and("WHERE Id = @Id9"),
        "WHERE Id = @Id9 AND Age > @Age0"
    );
    assert_eq!(
        filter.apply_or("WHERE Id = @Id9"),
        "WHERE Id = @Id9 OR Age > @Age0"
    );
    assert_eq!(filter.apply_and(""), "WHERE Age > @Age0");
    assert_eq!(FilterBuilder::new().apply_and("WHERE  x = 1"), "WHERE x = 1");
}

#[test]
fn continuing_builder_resumes_ordinals() {
    let mut params = ParamList::new();
    params.allocate("Name", "Victor");
    let mut filter = FilterBuilder::continuing(params);
    filter.column("Id").equal_to(1);
    assert_eq!(filter.text(), "WHERE Id = @Id1");
    assert_eq!(filter.params().len(), 2);
}
