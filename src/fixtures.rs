use crate::checklist::Checklist;
use crate::domain::{ChecklistRecord, Rank};

pub(crate) fn sample_checklist() -> Checklist {
    Checklist::from_records(vec![
        ChecklistRecord::accepted("2217-1", "Aspidosperma", Rank::Genus, "Apocynaceae"),
        ChecklistRecord::synonym(
            "41511-1",
            "Coutinia",
            Rank::Genus,
            "Apocynaceae",
            "2217-1",
            "Aspidosperma",
        ),
        ChecklistRecord::accepted("77100-1", "Aspidosperma album", Rank::Species, "Apocynaceae")
            .with_parent("2217-1", "Aspidosperma"),
        ChecklistRecord::accepted(
            "77101-1",
            "Aspidosperma album var. tenax",
            Rank::Variety,
            "Apocynaceae",
        )
        .with_parent("77100-1", "Aspidosperma album"),
        ChecklistRecord::synonym(
            "77102-1",
            "Aspidosperma album subsp. tenax",
            Rank::Subspecies,
            "Apocynaceae",
            "77101-1",
            "Aspidosperma album var. tenax",
        ),
        ChecklistRecord::accepted("35260-1", "Richardia", Rank::Genus, "Rubiaceae"),
        ChecklistRecord::accepted("60-1", "Capirona", Rank::Genus, "Rubiaceae"),
        ChecklistRecord::accepted(
            "77210192-1",
            "Capirona macrophylla",
            Rank::Species,
            "Rubiaceae",
        )
        .with_parent("60-1", "Capirona"),
        ChecklistRecord::synonym(
            "44583-2",
            "Capirona decorticans",
            Rank::Species,
            "Rubiaceae",
            "77210192-1",
            "Capirona macrophylla",
        ),
        ChecklistRecord::accepted("328988-2", "Condylocarpon", Rank::Genus, "Apocynaceae"),
        ChecklistRecord::accepted("30000-1", "Tordylium", Rank::Genus, "Apiaceae"),
        ChecklistRecord::synonym(
            "39836-1",
            "Condylocarpus",
            Rank::Genus,
            "Apiaceae",
            "30000-1",
            "Tordylium",
        ),
        ChecklistRecord::accepted("26000-1", "Pinus", Rank::Genus, "Pinaceae"),
        ChecklistRecord::synonym(
            "11637-1",
            "Condylocarpus",
            Rank::Genus,
            "Pinaceae",
            "26000-1",
            "Pinus",
        ),
        ChecklistRecord::accepted("2000-1", "Asclepias", Rank::Genus, "Apocynaceae"),
        ChecklistRecord::accepted(
            "94213-1",
            "Asclepias curassavica",
            Rank::Species,
            "Apocynaceae",
        )
        .with_parent("2000-1", "Asclepias"),
        ChecklistRecord::accepted("94100-1", "Asclepias nivea", Rank::Species, "Apocynaceae")
            .with_parent("2000-1", "Asclepias"),
        ChecklistRecord::synonym(
            "94212-1",
            "Asclepias curassavica",
            Rank::Species,
            "Apocynaceae",
            "94100-1",
            "Asclepias nivea",
        ),
    ])
}
